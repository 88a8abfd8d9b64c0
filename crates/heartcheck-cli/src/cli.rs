use clap::{Arg, Command};

/// Argument definition for the `heartcheck` binary.
pub fn build_cli() -> Command {
    Command::new("heartcheck")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Train a logistic regression DEATH_EVENT classifier on heart failure clinical records")
        .after_help(
            "Environment:\n  \
             HEARTCHECK_CONFIG  JSON training configuration (data source, schema, split, output paths)\n  \
             HEARTCHECK_LOG     log filter, e.g. `debug` or `error,heartcheck=trace`",
        )
        .arg(
            Arg::new("C")
                .long("C")
                .value_name("FLOAT")
                .help("Inverse of regularization strength; smaller values regularize more")
                .value_parser(parse_positive_f64)
                .default_value("1.0"),
        )
        .arg(
            Arg::new("max_iter")
                .long("max_iter")
                .value_name("INT")
                .help("Maximum number of solver iterations")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("100"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("INT")
                .help(
                    "Seed for the train/test shuffle. Overrides the seed in the configuration \
                     file; without one the split differs between runs.",
                )
                .value_parser(clap::value_parser!(u64)),
        )
}

fn parse_positive_f64(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("must be a positive finite number, got {}", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let matches = build_cli().try_get_matches_from(["heartcheck"]).unwrap();
        assert_eq!(*matches.get_one::<f64>("C").unwrap(), 1.0);
        assert_eq!(*matches.get_one::<u64>("max_iter").unwrap(), 100);
        assert!(matches.get_one::<u64>("seed").is_none());
    }

    #[test]
    fn non_positive_values_are_rejected() {
        for args in [
            ["heartcheck", "--C", "0"],
            ["heartcheck", "--C", "-2.5"],
            ["heartcheck", "--C", "abc"],
            ["heartcheck", "--max_iter", "0"],
            ["heartcheck", "--max_iter", "-5"],
            ["heartcheck", "--max_iter", "1.5"],
        ] {
            assert!(build_cli().try_get_matches_from(args).is_err(), "{:?}", args);
        }
    }

    #[test]
    fn parses_all_flags() {
        let matches = build_cli()
            .try_get_matches_from(["heartcheck", "--C", "0.5", "--max_iter", "250", "--seed", "9"])
            .unwrap();
        assert_eq!(*matches.get_one::<f64>("C").unwrap(), 0.5);
        assert_eq!(*matches.get_one::<u64>("max_iter").unwrap(), 250);
        assert_eq!(matches.get_one::<u64>("seed").copied(), Some(9));
    }
}
