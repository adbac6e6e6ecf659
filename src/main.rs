use clap::Parser;
use env_logger::Env;
use log::{debug, warn};
use snafu::ErrorCompat;

mod args;
mod live;

use crate::args::{Args, Command};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();
    debug!("args: {:?}", args);

    let res = match args.command {
        Command::Show { out, reference } => live::run_show(&args.config, out, reference).await,
        Command::Enter {
            seat,
            center,
            vote,
            invalid,
            user,
            password,
        } => {
            live::run_enter(
                &args.config,
                &seat,
                center,
                &vote,
                invalid,
                &user,
                &password,
            )
            .await
        }
        Command::Reset { user, password } => live::run_reset(&args.config, &user, &password).await,
        Command::Watch => live::run_watch(&args.config).await,
    };

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
