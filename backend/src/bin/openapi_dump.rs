//! Print the OpenAPI document as JSON or YAML.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io;

use clap::{Parser, ValueEnum};
use groupstudy::ApiDoc;
use utoipa::OpenApi;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Json,
    Yaml,
}

/// `openapi-dump` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "openapi-dump",
    about = "Print the study group API's OpenAPI document",
    version
)]
struct CliArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

fn render(format: Format) -> io::Result<String> {
    let doc = ApiDoc::openapi();
    match format {
        Format::Json => doc.to_pretty_json().map_err(io::Error::other),
        Format::Yaml => doc.to_yaml().map_err(io::Error::other),
    }
}

fn main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    println!("{}", render(args.format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Format::Json, "\"openapi\"")]
    #[case(Format::Yaml, "openapi:")]
    fn renders_each_format(#[case] format: Format, #[case] marker: &str) {
        let rendered = render(format).expect("document renders");

        assert!(rendered.contains(marker));
        assert!(rendered.contains("/api/v1/study-groups"));
    }

    #[rstest]
    fn format_defaults_to_json() {
        let args = CliArgs::try_parse_from(["openapi-dump"]).expect("args parse");

        assert!(matches!(args.format, Format::Json));
    }
}
