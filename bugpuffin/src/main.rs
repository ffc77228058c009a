use std::process::ExitCode;

use bugpuffin::session::SessionTarget;

pub fn main() -> ExitCode {
    greypuffin::cli::main(SessionTarget)
}
