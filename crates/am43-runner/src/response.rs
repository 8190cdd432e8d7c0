//! Text returned to whoever triggered an action.

use am43_control::ActionOutcome;
use am43_protocol::DeviceStatus;

/// Body of `GET /`.
pub const BANNER: &str = "A-OK AM43 BLE Smart Blinds Drive Service\n\n";

/// Body returned when an action fails.
pub const ERROR_BODY: &str = "ERROR\n";

/// Render the merged readings, `?` standing in for anything not reported.
pub fn format_status(status: &DeviceStatus) -> String {
    format!(
        "Battery: {}%<BR/>Position: {}%<BR/>Light: {}%<BR/>",
        reading(status.battery),
        reading(status.position),
        reading(status.light)
    )
}

/// Response body for a finished action.
pub fn format_outcome(outcome: &ActionOutcome) -> String {
    if outcome.success {
        format_status(&outcome.status)
    } else {
        ERROR_BODY.to_string()
    }
}

fn reading(value: Option<u8>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use am43_control::BlindsAction;

    fn outcome(success: bool, status: DeviceStatus) -> ActionOutcome {
        ActionOutcome {
            action: BlindsAction::Close,
            success,
            all_succeeded: success,
            any_succeeded: success,
            status,
            devices: Vec::new(),
            cancelled: false,
        }
    }

    #[test]
    fn test_success_body() {
        let status = DeviceStatus {
            battery: Some(80),
            position: Some(0),
            light: Some(10),
        };
        assert_eq!(
            format_outcome(&outcome(true, status)),
            "Battery: 80%<BR/>Position: 0%<BR/>Light: 10%<BR/>"
        );
    }

    #[test]
    fn test_unknown_readings() {
        let status = DeviceStatus {
            battery: Some(55),
            ..DeviceStatus::unknown()
        };
        assert_eq!(
            format_status(&status),
            "Battery: 55%<BR/>Position: ?%<BR/>Light: ?%<BR/>"
        );
    }

    #[test]
    fn test_failure_body() {
        let status = DeviceStatus {
            battery: Some(80),
            position: Some(0),
            light: Some(10),
        };
        assert_eq!(format_outcome(&outcome(false, status)), "ERROR\n");
    }
}
