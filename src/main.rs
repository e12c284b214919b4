//! GPU ray tracer - interactive viewer entry point.

use std::env;

use raytracer::viewer::{self, Options};

fn print_usage(program: &str) {
    println!("GPU Ray Tracer {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: {} [options]", program);
    println!();
    println!("Options:");
    println!("  -r, --resolution <WxH>  Render target size (default 1920x1080)");
    println!("  -s, --seed <N>          Seed for the per-frame sample stream");
    println!("      --reset-settings    Ignore saved settings and start from defaults");
    println!("  -h, --help              Show this help");
    println!();
    println!("Environment:");
    println!("  RUST_LOG=info           Log level (env_logger)");
    println!("  RAYTRACER_TRACE=1       Write a Chrome trace to trace.json");
}

fn parse_resolution(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow::anyhow!("expected WxH, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| anyhow::anyhow!("bad width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| anyhow::anyhow!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        anyhow::bail!("resolution must be non-zero, got {}x{}", w, h);
    }
    Ok((w, h))
}

/// `None` means help was requested.
fn parse_args(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut options = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-r" | "--resolution" => {
                let value = iter.next().ok_or_else(|| anyhow::anyhow!("{} needs a value", arg))?;
                options.resolution = Some(parse_resolution(value)?);
            }
            "-s" | "--seed" => {
                let value = iter.next().ok_or_else(|| anyhow::anyhow!("{} needs a value", arg))?;
                options.seed = Some(value.parse().map_err(|_| anyhow::anyhow!("bad seed '{}'", value))?);
            }
            "--reset-settings" => options.reset_settings = true,
            other => anyhow::bail!("unknown option '{}'", other),
        }
    }
    Ok(Some(options))
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("raytracer");

    let options = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(Some(options)) => options,
        Ok(None) => {
            print_usage(program);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage(program);
            std::process::exit(2);
        }
    };

    viewer::run(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolution() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution("64X32").unwrap(), (64, 32));
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("0x10").is_err());
    }

    #[test]
    fn test_parse_args() {
        let opts = parse_args(&args(&["--resolution", "1280x720", "-s", "7", "--reset-settings"]))
            .unwrap()
            .unwrap();
        assert_eq!(opts.resolution, Some((1280, 720)));
        assert_eq!(opts.seed, Some(7));
        assert!(opts.reset_settings);

        assert!(parse_args(&args(&["-h"])).unwrap().is_none());
        assert!(parse_args(&args(&["--seed"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
