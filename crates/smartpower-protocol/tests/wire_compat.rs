// Verify the wire format matches what the device firmware expects.
// These tests ensure protocol compatibility is never broken.

use smartpower_core::OneTimeSource;
use smartpower_protocol::{
    DailyWake, MacAddress, OneTimeSlot, ScheduleSnapshot, SyncForm, SyncRequest, WeeklySlot,
};

fn mac() -> MacAddress {
    "AA:BB:CC:DD:EE:FF".parse().unwrap()
}

#[test]
fn request_form_field_layout() {
    let req = SyncRequest {
        mac: mac(),
        daily: DailyWake {
            enabled: true,
            hour: 7,
            minute: 30,
        },
        weekly: vec![
            WeeklySlot {
                weekday: 0,
                hour: 8,
                minute: 0,
            },
            WeeklySlot {
                weekday: 6,
                hour: 9,
                minute: 15,
            },
        ],
        onetime: vec![OneTimeSlot {
            year: 2024,
            month: 3,
            day: 9,
            hour: 21,
            minute: 5,
            source: OneTimeSource::Quick,
        }],
    };
    let form = req.to_form();

    assert_eq!(form.mac, "AA:BB:CC:DD:EE:FF");
    assert_eq!(form.d_en, "1");
    assert_eq!(form.d_h, "7");
    assert_eq!(form.d_m, "30");
    assert_eq!(form.weekly, "0,8,0;6,9,15");
    assert_eq!(form.onetime, "2024,3,9,21,5,quick");
}

#[test]
fn request_decodes_on_receiving_side() {
    let snapshot = ScheduleSnapshot {
        daily: DailyWake {
            enabled: false,
            hour: 6,
            minute: 45,
        },
        weekly: vec![WeeklySlot {
            weekday: 2,
            hour: 22,
            minute: 0,
        }],
        onetime: vec![],
    };
    let form = SyncRequest::from_snapshot(mac(), &snapshot).to_form();
    let decoded = form.decode();

    assert_eq!(decoded.mac, Some(mac()));
    assert_eq!(decoded.daily, Some(snapshot.daily));
    assert_eq!(decoded.weekly, snapshot.weekly);
    assert!(decoded.onetime.is_empty());
    assert!(decoded.rejected.is_empty());
}

#[test]
fn one_malformed_onetime_item_among_three() {
    let form = SyncForm {
        onetime: "2024,1,1,8,0,calendar;2024,1,x,8,0,calendar;2024,1,2,8,0,quick".to_string(),
        ..Default::default()
    };
    let decoded = form.decode();

    assert_eq!(decoded.onetime.len(), 2, "valid items must survive");
    assert_eq!(decoded.rejected.len(), 1);
    assert_eq!(decoded.onetime[1].day, 2);
}

#[test]
fn snapshot_json_shape() {
    let snapshot = ScheduleSnapshot {
        daily: DailyWake {
            enabled: true,
            hour: 7,
            minute: 0,
        },
        weekly: vec![WeeklySlot {
            weekday: 4,
            hour: 18,
            minute: 30,
        }],
        onetime: vec![OneTimeSlot {
            year: 2025,
            month: 12,
            day: 24,
            hour: 20,
            minute: 0,
            source: OneTimeSource::Calendar,
        }],
    };
    let json = serde_json::to_string(&snapshot).unwrap();

    assert!(json.contains(r#""daily":{"enabled":true,"hour":7,"minute":0}"#));
    assert!(json.contains(r#""weekly":[{"weekday":4,"hour":18,"minute":30}]"#));
    assert!(json.contains(r#""source":"calendar""#));
}

#[test]
fn snapshot_tolerates_missing_lists() {
    let json = r#"{"daily":{"enabled":false,"hour":0,"minute":0}}"#;
    let snapshot: ScheduleSnapshot = serde_json::from_str(json).unwrap();
    assert!(snapshot.weekly.is_empty());
    assert!(snapshot.onetime.is_empty());
}
