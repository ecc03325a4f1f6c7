use csxp::{cmdline, interpreter};

fn main() -> Result<(), cmdline::Error> {
    pretty_env_logger::init();
    let mut env = interpreter::standard_environment()?;
    let args = std::env::args().collect();
    cmdline::launch(args, &mut env)
}
