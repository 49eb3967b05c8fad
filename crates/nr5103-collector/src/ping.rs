//! Latency probe: one ICMP echo via the system `ping`.
//!
//! Raw ICMP sockets need privileges the collector usually doesn't run with,
//! so this shells out and parses the `time=` figure from the output.

use std::time::Duration;

use chrono::{DateTime, Utc};
use nr5103_radio::{FieldValue, Observation};

pub const MEASUREMENT: &str = "network_ping";

/// Round-trip time to `host` in milliseconds, or `None` on any failure.
pub async fn probe(host: &str, timeout: Duration) -> Option<f64> {
    let wait_s = timeout.as_secs().max(1).to_string();
    let output = tokio::process::Command::new("ping")
        .args(["-c", "1", "-W", &wait_s, host])
        .kill_on_drop(true)
        .output();

    // -W only bounds the wait for a reply; DNS resolution is not covered.
    let output = match tokio::time::timeout(timeout + Duration::from_secs(1), output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!(host, error = %e, "ping not available");
            return None;
        }
        Err(_) => {
            tracing::debug!(host, "ping timed out");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(host, status = %output.status, "no ping reply");
        return None;
    }
    parse_latency_ms(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the RTT from `ping` output (`time=12.3 ms`, or `time<1ms` on
/// some platforms).
pub fn parse_latency_ms(output: &str) -> Option<f64> {
    let idx = output.find("time=").map(|i| i + 5).or_else(|| output.find("time<").map(|i| i + 5))?;
    let digits: String = output[idx..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn observation(host: &str, latency_ms: f64, time: DateTime<Utc>) -> Observation {
    Observation::new(
        MEASUREMENT,
        [("target", Some(host.to_string()))],
        [("latency_ms", Some(FieldValue::Float(latency_ms)))],
        time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iputils_output() {
        let out = "PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.\n\
                   64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=14.2 ms\n\n\
                   --- 8.8.8.8 ping statistics ---\n\
                   1 packets transmitted, 1 received, 0% packet loss, time 0ms\n";
        assert_eq!(parse_latency_ms(out), Some(14.2));
    }

    #[test]
    fn parses_sub_millisecond_marker() {
        assert_eq!(parse_latency_ms("Reply from 10.0.0.1: bytes=32 time<1ms TTL=64"), Some(1.0));
    }

    #[test]
    fn no_reply_is_none() {
        let out = "1 packets transmitted, 0 received, 100% packet loss, time 0ms\n";
        assert_eq!(parse_latency_ms(out), None);
        assert_eq!(parse_latency_ms(""), None);
    }

    #[test]
    fn observation_shape() {
        let time = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let obs = observation("8.8.8.8", 14.2, time);
        assert_eq!(
            obs.to_line_protocol(),
            "network_ping,target=8.8.8.8 latency_ms=14.2 1700000000000000000"
        );
    }
}
