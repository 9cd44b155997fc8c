use rw_semaphores::*;
use std::process::ExitCode;
use tracing::error;

/// Runs both solutions on the same parameters.
fn main() -> ExitCode {
    init_tracing();
    let (params_path, out) = args();

    let res = Params::from_file(&params_path).and_then(|params| {
        for policy in [Policy::WriterPreference, Policy::Fair] {
            run(policy, params, &out)?;
        }
        Ok(())
    });

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
