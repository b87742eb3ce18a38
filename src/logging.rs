use std::io::Write;

use env_logger::{Env, WriteStyle};

/// Install the process logger. `RUST_LOG` overrides the `info` default.
pub fn try_init() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[WHEEL | {}] {}",
                record.level(),
                record.args()
            )
        })
        .write_style(WriteStyle::Auto)
        .try_init()
}
