use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn zero_count_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("client.conf");
    fs::write(&config, "TrafficPercentage=100\nName=/example\n")?;

    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("client").arg("-c").arg("0").arg(&config);
    cmd.assert().success();
    Ok(())
}

#[test]
fn missing_configuration_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("client").arg(dir.path().join("nowhere.conf"));
    cmd.assert().code(2);

    // a directory is not a configuration file either
    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("server").arg(dir.path());
    cmd.assert().code(2);
    Ok(())
}

#[test]
fn configuration_without_valid_pattern_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("client.conf");
    fs::write(&config, "TrafficPercentage=100\nName=/example\nMustBeFresh=maybe\n")?;

    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("client").arg("-c").arg("1").arg(&config);
    cmd.assert().code(2);
    Ok(())
}

#[test]
fn zero_interval_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("client.conf");
    fs::write(&config, "TrafficPercentage=100\nName=/example\n")?;

    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("client").arg("-i").arg("0").arg(&config);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn loopback_exchange() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let client_config = dir.path().join("client.conf");
    let server_config = dir.path().join("server.conf");
    let report = dir.path().join("report.json");
    fs::write(
        &client_config,
        "# one pattern\nTrafficPercentage=100\nName=/example/hello\nNameAppendSequenceNumber=0\nExpectedContent=hello\n",
    )?;
    fs::write(&server_config, "Name=/example\nContent=hello\nFreshnessPeriod=1000\n")?;

    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("loopback")
        .arg("-c")
        .arg("3")
        .arg("-i")
        .arg("10")
        .arg("-s")
        .arg("0")
        .arg("--report-json")
        .arg(&report)
        .arg("--server-config")
        .arg(&server_config)
        .arg(&client_config);
    cmd.assert().success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(json["global"]["sent"], 3);
    assert_eq!(json["global"]["received"], 3);
    assert_eq!(json["has_error"], false);
    Ok(())
}

#[test]
fn unanswered_interests_fail() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("client.conf");
    fs::write(&config, "TrafficPercentage=100\nName=/unrouted\n")?;

    // nothing serves the prefix: every Interest is nacked
    let mut cmd = Command::cargo_bin("ndn-traffic")?;
    cmd.arg("client").arg("-c").arg("2").arg("-i").arg("1").arg(&config);
    cmd.assert().code(1);
    Ok(())
}
