use std::process::ExitCode;

fn main() -> ExitCode {
    match hostbridged::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(
                target: "hostbridged",
                code = error.code().code(),
                %error,
                "daemon exited with an error"
            );
            ExitCode::FAILURE
        }
    }
}
