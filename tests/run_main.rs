use std::time::Duration;

use assert_cmd::Command;

const TIMEOUT_DURATION: Duration = Duration::from_secs(30);

#[test]
#[ignore = "needs a GPU adapter for the offscreen render target"]
fn headless_session_exits_cleanly() -> Result<(), anyhow::Error> {
    Command::cargo_bin(env!("CARGO_PKG_NAME"))?
        .env("HEADLESS", "true")
        .timeout(TIMEOUT_DURATION)
        .assert()
        .success();
    Ok(())
}
