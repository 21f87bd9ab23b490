mod opt;
mod routes;

use clap::Parser;
use opt::{Cmd, Opt};

fn route_cmd(opt: Opt) -> i32 {
    match opt.cmd {
        Cmd::Run(cmd) => routes::run(cmd),
        Cmd::Summarize(cmd) => routes::summarize_engine(cmd),
    }
}

fn main() {
    env_logger::init();

    let opt = Opt::parse();

    let exit_code = route_cmd(opt);

    std::process::exit(exit_code);
}
