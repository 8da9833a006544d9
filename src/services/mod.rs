//! Local system services the bot drives: containers and the scanner.

pub mod docker;
pub mod scanner;

pub use docker::{ContainerRestart, DockerCli};
pub use scanner::{ScanImage, Scanner};
