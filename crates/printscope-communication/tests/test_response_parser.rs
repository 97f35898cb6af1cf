use printscope_communication::firmware::marlin::*;
use printscope_core::Position;
use proptest::prelude::*;

#[test]
fn test_parse_temperatures_with_targets() {
    let parser = MarlinResponseParser::new();
    let report = parser
        .parse_temperatures("ok T:210.3 /215.0 B:59.8 /60.0 @:127 B@:0")
        .unwrap();
    assert_eq!(
        report.hotend,
        Some(HeaterReading {
            current: 210.3,
            target: Some(215.0)
        })
    );
    assert_eq!(report.bed.unwrap().target, Some(60.0));
}

#[test]
fn test_parse_temperatures_without_targets() {
    let parser = MarlinResponseParser::new();
    let report = parser.parse_temperatures("T:21.5 B:22.0").unwrap();
    assert_eq!(report.hotend.unwrap().current, 21.5);
    assert_eq!(report.hotend.unwrap().target, None);
    assert_eq!(report.bed.unwrap().current, 22.0);
}

#[test]
fn test_parse_temperatures_no_data() {
    let parser = MarlinResponseParser::new();
    assert_eq!(parser.parse_temperatures("ok"), None);
    assert_eq!(parser.parse_temperatures("echo:busy: processing"), None);
}

#[test]
fn test_parse_position() {
    let parser = MarlinResponseParser::new();
    let position = parser
        .parse_position("X:10.00 Y:20.50 Z:-1.25 E:0.00 Count X:800 Y:1640 Z:-500\nok")
        .unwrap();
    assert_eq!(position, Position::new(10.0, 20.5, -1.25));
    assert_eq!(parser.parse_position("ok"), None);
}

#[test]
fn test_parse_firmware_info() {
    let parser = MarlinResponseParser::new();
    let text = "FIRMWARE_NAME:Marlin V1.0.2 (Jul 20 2023) SOURCE_CODE_URL:github.com/MarlinFirmware/Marlin PROTOCOL_VERSION:1.0 MACHINE_TYPE:Kobra 2 Neo EXTRUDER_COUNT:1 UUID:cede2a2f-41a2-4748-9b12-c55c62f367ff\nCap:AUTOREPORT_TEMP:1\nok";
    let info = parser.parse_firmware_info(text).unwrap();
    assert_eq!(info.name, "Marlin");
    assert_eq!(info.version.as_deref(), Some("V1.0.2 (Jul 20 2023)"));
    assert_eq!(info.machine_type.as_deref(), Some("Kobra 2 Neo"));
    assert_eq!(info.fields.get("EXTRUDER_COUNT").map(String::as_str), Some("1"));
    assert_eq!(info.fields.get("PROTOCOL_VERSION").map(String::as_str), Some("1.0"));
}

#[test]
fn test_parse_firmware_info_missing() {
    let parser = MarlinResponseParser::new();
    assert_eq!(parser.parse_firmware_info("echo:Unknown command\nok"), None);
}

#[test]
fn test_linear_move_encoding() {
    let creator = MarlinCommandCreator::new(false);
    assert_eq!(
        creator.linear_move(&Position::new(10.0, 20.0, 5.5), 1500.0),
        "G1 X10.000 Y20.000 Z5.500 F1500"
    );
}

#[test]
fn test_linear_move_swaps_yz_on_the_wire() {
    let creator = MarlinCommandCreator::new(true);
    assert_eq!(
        creator.linear_move(&Position::new(10.0, 20.0, 5.5), 1200.0),
        "G1 X10.000 Y5.500 Z20.000 F1200"
    );

    let reported = Position::new(10.0, 5.5, 20.0);
    assert_eq!(creator.to_logical(&reported), Position::new(10.0, 20.0, 5.5));
}

#[test]
fn test_fixed_commands() {
    let creator = MarlinCommandCreator::default();
    assert_eq!(creator.command(MarlinCommand::HomeAll), "G28");
    assert_eq!(creator.command(MarlinCommand::EmergencyStop), "M112");
    assert_eq!(
        MarlinCommand::setup_sequence().map(|c| c.as_str()),
        ["G21", "G90"]
    );
}

proptest! {
    #[test]
    fn prop_reported_position_maps_back_to_logical_frame(
        x in -500.0f64..500.0,
        y in -500.0f64..500.0,
        z in -500.0f64..500.0,
        swap in any::<bool>(),
    ) {
        let creator = MarlinCommandCreator::new(swap);
        let machine = creator.to_machine(&Position::new(x, y, z));
        let report = format!(
            "X:{:.3} Y:{:.3} Z:{:.3} E:0.00 Count X:0 Y:0 Z:0",
            machine.x, machine.y, machine.z
        );
        let parsed = MarlinResponseParser::new().parse_position(&report).unwrap();
        let logical = creator.to_logical(&parsed);
        prop_assert!((logical.x - x).abs() < 1e-3);
        prop_assert!((logical.y - y).abs() < 1e-3);
        prop_assert!((logical.z - z).abs() < 1e-3);
    }
}
