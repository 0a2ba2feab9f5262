use anyhow::{Context, Result};
use clap::{App, Arg, ArgGroup};
use frozen_blog::config::Config;
use frozen_blog::{freeze, serve};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = App::new("frozen-blog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A minimal static blog: serve it live, freeze it to HTML")
        .arg(
            Arg::with_name("freeze")
                .short("f")
                .long("freeze")
                .help("freeze the current site state to the output folder"),
        )
        .arg(
            Arg::with_name("server")
                .short("s")
                .long("server")
                .help("run the local web server and watch for changes"),
        )
        .group(
            ArgGroup::with_name("mode")
                .args(&["freeze", "server"])
                .required(true),
        )
        .arg(
            Arg::with_name("root")
                .short("r")
                .long("root")
                .value_name("DIR")
                .takes_value(true)
                .default_value(".")
                .help("the blog directory, holding blog.yaml"),
        )
        .get_matches();

    let root = PathBuf::from(matches.value_of("root").unwrap_or("."));

    if matches.is_present("freeze") {
        let config = Config::load(&root, true).context("loading configuration")?;
        freeze::freeze(&config).context("freezing")?;
    } else {
        serve::Server::new(&root)
            .context("starting the server")?
            .run()
            .context("serving")?;
    }
    Ok(())
}
