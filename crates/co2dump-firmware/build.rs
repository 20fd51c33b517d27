//! Bakes the link layout into the firmware.
//!
//! Settings come from the environment, or from a `.env` file next to the
//! crate. Anything left unset falls back to the defaults in `co2dump-core`.

const KEYS: [&str; 3] = [
    "CO2DUMP_SENSOR_LINKS",
    "CO2DUMP_SENSOR_COUNT",
    "CO2DUMP_POLL_INTERVAL_US",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // A missing .env file is fine; the plain environment still applies.
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        println!("cargo:warning=failed to load .env: {err}");
    }

    for key in KEYS {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
