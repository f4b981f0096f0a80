//! Default logging setup for the `exhash` driver

const TIMESTAMP_STYLE: anstyle::Style =
    anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightBlack)));

const TARGET_STYLE: anstyle::Style =
    anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Magenta)));

/// Installs an `env_logger` backend filtered by `EXHASH_LOG` (default
/// `info`). `EXHASH_LOG_STYLE` controls colors.
pub fn setup() {
    let start_time = std::time::Instant::now();

    env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or("EXHASH_LOG", "info")
            .write_style("EXHASH_LOG_STYLE"),
    )
    .format(move |buf, record| {
        use std::io::Write;

        let timestamp = start_time.elapsed();
        let level = record.level();

        writeln!(
            buf,
            "{} {} {} {}",
            format_args!("{style}{timestamp:>9.2?}{style:#}", style = TIMESTAMP_STYLE),
            format_args!(
                "{style}{level:<5}{style:#}",
                style = buf.default_level_style(level),
            ),
            format_args!("{style}{}{style:#}", record.target(), style = TARGET_STYLE),
            record.args(),
        )
    })
    .init();
}
