use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: studygate [<config-path>]\n\n\
Runs the AI gateway proxy. The config path defaults to ./studygate.jsonc.";

pub fn config_path_from_args() -> Result<PathBuf> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.as_slice() {
        [] => {
            let mut path = env::current_dir()?;
            path.push("studygate.jsonc");
            Ok(path)
        }
        [flag] if flag == "-h" || flag == "--help" => Err(anyhow!("{USAGE}")),
        [path] => Ok(PathBuf::from(path)),
        _ => Err(anyhow!("expected at most one argument\n\n{USAGE}")),
    }
}
