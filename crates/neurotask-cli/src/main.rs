use std::ffi::OsString;
use std::process::ExitCode;

fn main() -> ExitCode {
  let args: Vec<OsString> =
    std::env::args_os().collect();
  match neurotask_core::run(args) {
    | Ok(()) => ExitCode::SUCCESS,
    | Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::FAILURE
    }
  }
}
