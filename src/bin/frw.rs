use rw_semaphores::{args, init_tracing, run, Params, Policy};
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    init_tracing();
    let (params_path, out) = args();

    let res = Params::from_file(&params_path).and_then(|params| run(Policy::Fair, params, &out));
    match res {
        Ok(report) => {
            println!(
                "readers: {:?} s, writers: {:?} s",
                report.reader_average, report.writer_average
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
