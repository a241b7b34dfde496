//! vigil-remote — production collaborators for the Vigil control loop.
//!
//! - [`ec2::Ec2Fleet`]: address resolver and compute controller backed by EC2
//! - [`ssh::SshExecutor`]: runs restart commands over SSH with a private key
//! - [`smtp::SmtpNotifier`]: mails alerts through an SMTP relay (STARTTLS)

pub mod ec2;
pub mod smtp;
pub mod ssh;

pub use ec2::Ec2Fleet;
pub use smtp::SmtpNotifier;
pub use ssh::SshExecutor;
