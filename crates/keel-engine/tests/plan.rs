//! Planner behavior over a small but realistic laptop fixture: one iGPU, a
//! Broadcom Wi-Fi card behind PCI0 and a firmware TPM.

use keel_aml::{body, AmlData, AmlNode, AmlObject, AmlTable, NameSeg, DSDT_SIGNATURE};
use keel_compat::{
    CompatibilityDb, CompatibilityEntry, DeviceClass, DriverRequirement, GpuSpoofCandidate,
    IdMatch, PropertySpec, Quirk, SuppressionPolicy,
};
use keel_engine::{build_plan, EngineError, NodeEditOp, PatchDirective};
use keel_profile::{
    CpuInfo, CpuVendor, DeviceId, GpuInfo, GpuVendor, HardwareProfile, NetworkAdapter,
    NetworkKind, OsVersion, OsVersionRange,
};

const GPU_ID: DeviceId = DeviceId::new(0x8086, 0x9a49);
const WIFI_ID: DeviceId = DeviceId::new(0x14e4, 0x43a0);
const CHIPSET_ID: DeviceId = DeviceId::new(0x8086, 0x3482);

fn gpu(device: DeviceId, primary: bool) -> GpuInfo {
    GpuInfo {
        vendor: GpuVendor::Intel,
        device,
        family: "tiger-lake".into(),
        integrated: true,
        vram_class: 0,
        display_outputs: 3,
        primary,
        disabled: false,
    }
}

fn profile() -> HardwareProfile {
    HardwareProfile {
        cpu: CpuInfo {
            vendor: CpuVendor::Intel,
            generation: 11,
            performance_cores: 4,
            efficiency_cores: 0,
            logical_processors: 8,
        },
        gpus: vec![gpu(GPU_ID, true)],
        chipset: CHIPSET_ID,
        storage: Vec::new(),
        network: Vec::new(),
        audio: Vec::new(),
        usb: Vec::new(),
        target_os: OsVersion::new(13, 0),
        display_required: true,
        suppress_tpm: false,
    }
}

fn entry(matcher: IdMatch, class: DeviceClass) -> CompatibilityEntry {
    CompatibilityEntry {
        matcher,
        class,
        supported_os: OsVersionRange::from(OsVersion::new(12, 0)),
        drivers: Vec::new(),
        properties: Vec::new(),
        quirks: Vec::new(),
        suppression: None,
        acpi_hids: Vec::new(),
        acpi_names: Vec::new(),
        spoof_candidates: Vec::new(),
    }
}

fn driver(id: &str) -> DriverRequirement {
    DriverRequirement {
        id: id.to_owned(),
        mandatory: false,
        depends_on: None,
        load_hint: 0,
    }
}

fn gpu_entry() -> CompatibilityEntry {
    let mut e = entry(IdMatch::Exact(GPU_ID), DeviceClass::Gpu);
    e.drivers = vec![driver("igpu-framebuffer")];
    e
}

fn wifi_entry() -> CompatibilityEntry {
    let mut e = entry(IdMatch::Exact(WIFI_ID), DeviceClass::WifiAdapter);
    e.drivers = vec![driver("brcm-wifi")];
    e.suppression = Some(SuppressionPolicy::AcpiStatus);
    e.acpi_hids = vec!["PCI14E4,43A0".to_owned()];
    e
}

fn dsdt() -> AmlTable {
    AmlTable::new(
        DSDT_SIGNATURE,
        *b"FIXTURE ",
        vec![AmlNode::scope(
            "_SB",
            vec![
                AmlNode::device(
                    "PCI0",
                    vec![
                        AmlNode::device("GFX0", vec![]),
                        AmlNode::device(
                            "WIFI",
                            vec![
                                AmlNode::name_value(
                                    "_HID",
                                    AmlData::String("PCI14E4,43A0".into()),
                                ),
                                AmlNode::name_value(
                                    "_PRW",
                                    AmlData::Package(vec![
                                        AmlData::Integer(0x0D),
                                        AmlData::Integer(0),
                                    ]),
                                ),
                                AmlNode::method("_STA", 0, false, body::return_integer(0x0F)),
                            ],
                        ),
                    ],
                ),
                AmlNode::device(
                    "TPM0",
                    vec![AmlNode::name_value(
                        "_HID",
                        AmlData::String("MSFT0101".into()),
                    )],
                ),
            ],
        )],
    )
}

fn override_value<'a>(
    directives: &'a [PatchDirective],
    key: &str,
) -> Option<&'a serde_json::Value> {
    directives.iter().find_map(|d| match d {
        PatchDirective::PropertyOverride { key_path, value } if key_path == key => Some(value),
        _ => None,
    })
}

#[test]
fn unsupported_gpu_is_a_hard_stop() {
    let db = CompatibilityDb::from_entries(vec![wifi_entry()]);
    assert_eq!(
        build_plan(&profile(), &db, &[]),
        Err(EngineError::UnsupportedGpu { device: GPU_ID })
    );
}

#[test]
fn gpu_outside_supported_os_is_a_hard_stop() {
    let mut gpu = gpu_entry();
    gpu.supported_os = OsVersionRange {
        min: OsVersion::new(10, 13),
        max: Some(OsVersion::new(12, 7)),
    };
    let db = CompatibilityDb::from_entries(vec![gpu]);
    assert_eq!(
        build_plan(&profile(), &db, &[]),
        Err(EngineError::GpuOsUnsupported {
            device: GPU_ID,
            os: OsVersion::new(13, 0),
        })
    );
}

#[test]
fn disabled_wifi_is_suppressed_without_a_driver() {
    let mut profile = profile();
    profile.network.push(NetworkAdapter {
        device: WIFI_ID,
        kind: NetworkKind::Wifi,
        disabled: true,
    });
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), wifi_entry()]);
    let tables = [dsdt()];

    let plan = build_plan(&profile, &db, &tables).unwrap();

    let sta_edits: Vec<_> = plan
        .directives
        .iter()
        .filter(|d| match d {
            PatchDirective::AcpiNodeEdit {
                path,
                op: NodeEditOp::ReplaceMethodBody(raw),
                ..
            } => {
                path.to_string() == "\\_SB_.PCI0.WIFI._STA"
                    && body::decode_return_integer(raw) == Some(0)
            }
            _ => false,
        })
        .collect();
    assert_eq!(sta_edits.len(), 1, "exactly one status override expected");

    let drivers: Vec<_> = plan.driver_ids().collect();
    assert!(drivers.contains(&"igpu-framebuffer"));
    assert!(!drivers.contains(&"brcm-wifi"));
}

#[test]
fn enabled_wifi_selects_its_driver() {
    let mut profile = profile();
    profile.network.push(NetworkAdapter {
        device: WIFI_ID,
        kind: NetworkKind::Wifi,
        disabled: false,
    });
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), wifi_entry()]);

    let plan = build_plan(&profile, &db, &[dsdt()]).unwrap();
    assert!(plan.driver_ids().any(|id| id == "brcm-wifi"));
}

#[test]
fn exact_entry_beats_family_entry() {
    let mut family = entry(
        IdMatch::Family {
            vendor: 0x8086,
            first: 0x9a00,
            last: 0x9aff,
        },
        DeviceClass::Gpu,
    );
    family.drivers = vec![driver("family-framebuffer")];
    let mut exact = gpu_entry();
    exact.drivers = vec![driver("exact-framebuffer")];
    // Declaration order must not matter when specificity differs.
    let db = CompatibilityDb::from_entries(vec![family, exact]);

    let plan = build_plan(&profile(), &db, &[]).unwrap();
    let drivers: Vec<_> = plan.driver_ids().collect();
    assert_eq!(drivers, vec!["exact-framebuffer"]);
}

#[test]
fn wake_state_below_floor_is_raised_to_the_default() {
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), wifi_entry()]);
    let tables = [dsdt()];
    let plan = build_plan(&profile(), &db, &tables).unwrap();

    assert!(plan.directives.iter().any(|d| matches!(
        d,
        PatchDirective::AcpiNodeEdit {
            table: 0,
            path,
            op: NodeEditOp::SetPackageElement { index: 1, value: 3 },
        } if path.to_string() == "\\_SB_.PCI0.WIFI._PRW"
    )));
}

#[test]
fn wake_floor_comes_from_the_matching_entry_quirk() {
    let mut wifi = wifi_entry();
    wifi.quirks = vec![Quirk::MinWakeState(4)];
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), wifi]);

    let plan = build_plan(&profile(), &db, &[dsdt()]).unwrap();
    assert!(plan.directives.iter().any(|d| matches!(
        d,
        PatchDirective::AcpiNodeEdit {
            op: NodeEditOp::SetPackageElement { index: 1, value: 4 },
            ..
        }
    )));
}

#[test]
fn wake_method_body_is_rewritten() {
    let table = AmlTable::new(
        DSDT_SIGNATURE,
        *b"FIXTURE ",
        vec![AmlNode::scope(
            "_SB",
            vec![AmlNode::device(
                "XHC",
                vec![AmlNode::method(
                    "_PRW",
                    0,
                    false,
                    body::return_package(&[0x6D, 0]),
                )],
            )],
        )],
    );
    let db = CompatibilityDb::from_entries(vec![gpu_entry()]);

    let plan = build_plan(&profile(), &db, &[table]).unwrap();
    let rewritten = plan
        .directives
        .iter()
        .find_map(|d| match d {
            PatchDirective::AcpiNodeEdit {
                op: NodeEditOp::ReplaceMethodBody(raw),
                path,
                ..
            } if path.to_string() == "\\_SB_.XHC_._PRW" => body::decode_return_package(raw),
            _ => None,
        });
    assert_eq!(rewritten, Some(vec![0x6D, 3]));
}

#[test]
fn tpm_suppression_goes_to_the_supplemental_table() {
    let mut profile = profile();
    profile.suppress_tpm = true;
    let db = CompatibilityDb::from_entries(vec![gpu_entry()]);

    let plan = build_plan(&profile, &db, &[dsdt()]).unwrap();
    let inserts: Vec<&AmlNode> = plan
        .directives
        .iter()
        .filter_map(|d| match d {
            PatchDirective::AcpiNodeInsert {
                table: None, node, ..
            } => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(inserts.len(), 1);

    // The inserted stanza re-opens \_SB_.TPM0 and overrides its _STA.
    let sta = inserts[0]
        .descend(&[NameSeg::new("TPM0"), NameSeg::new("_STA")])
        .unwrap();
    match sta.object() {
        AmlObject::Method { body: raw, .. } => {
            assert_eq!(body::decode_return_integer(raw), Some(0));
        }
        other => panic!("expected a method, got {other:?}"),
    }
    assert_eq!(inserts[0].name().as_str(), "_SB_");
}

#[test]
fn headless_target_drops_display_properties() {
    let mut gpu = gpu_entry();
    gpu.properties = vec![
        PropertySpec {
            key_path: "Display.framebuffer-patch".to_owned(),
            value: serde_json::json!("stub"),
        },
        PropertySpec {
            key_path: format!("DeviceProperties.{GPU_ID}.agdpmod"),
            value: serde_json::json!("pikera"),
        },
    ];
    let db = CompatibilityDb::from_entries(vec![gpu]);

    let mut profile = profile();
    profile.display_required = false;
    let plan = build_plan(&profile, &db, &[]).unwrap();

    assert!(override_value(&plan.directives, "Display.framebuffer-patch").is_none());
    assert!(
        override_value(&plan.directives, &format!("DeviceProperties.{GPU_ID}.agdpmod")).is_some()
    );
}

#[test]
fn spoof_picks_the_nearest_capability_match() {
    let near = DeviceId::new(0x8086, 0x9a40);
    let far = DeviceId::new(0x8086, 0x4c8a);
    let mut gpu = gpu_entry();
    gpu.quirks = vec![Quirk::SpoofRequired];
    gpu.spoof_candidates = vec![
        GpuSpoofCandidate {
            device: far,
            vram_class: 8,
            display_outputs: 1,
        },
        GpuSpoofCandidate {
            device: near,
            vram_class: 0,
            display_outputs: 3,
        },
    ];
    let db = CompatibilityDb::from_entries(vec![gpu]);

    let plan = build_plan(&profile(), &db, &[]).unwrap();
    let key = format!("DeviceProperties.{GPU_ID}.device-id");
    assert_eq!(
        override_value(&plan.directives, &key),
        Some(&serde_json::json!(near.to_string()))
    );
}

#[test]
fn spoof_required_without_candidates_is_a_hard_stop() {
    let mut gpu = gpu_entry();
    gpu.quirks = vec![Quirk::SpoofRequired];
    let db = CompatibilityDb::from_entries(vec![gpu]);
    assert_eq!(
        build_plan(&profile(), &db, &[]),
        Err(EngineError::UnsupportedGpu { device: GPU_ID })
    );
}

#[test]
fn hybrid_topology_gets_a_core_layout_hint() {
    let mut chipset = entry(IdMatch::Exact(CHIPSET_ID), DeviceClass::Platform);
    chipset.properties = vec![
        PropertySpec {
            key_path: "Kernel.Quirks.AppleXcpmCfgLock".to_owned(),
            value: serde_json::json!(true),
        },
        PropertySpec {
            key_path: "PlatformInfo.Generic.SystemProductName".to_owned(),
            value: serde_json::json!("MacBookPro17,1"),
        },
    ];
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), chipset]);

    let mut profile = profile();
    profile.cpu.performance_cores = 6;
    profile.cpu.efficiency_cores = 8;
    profile.cpu.logical_processors = 20;
    let plan = build_plan(&profile, &db, &[]).unwrap();

    let topo = override_value(&plan.directives, "Kernel.Quirks.ProvideCpuTopology").unwrap();
    assert_eq!(topo["performance"], 6);
    assert_eq!(topo["efficiency"], 8);
    assert!(override_value(&plan.directives, "Kernel.Quirks.AppleXcpmCfgLock").is_some());
    assert!(
        override_value(&plan.directives, "PlatformInfo.Generic.SystemProductName").is_some()
    );
}

#[test]
fn plans_are_deterministic_and_deduplicated() {
    let mut profile = profile();
    profile.suppress_tpm = true;
    profile.network.push(NetworkAdapter {
        device: WIFI_ID,
        kind: NetworkKind::Wifi,
        disabled: true,
    });
    // A second GPU sharing the entry must not duplicate its driver.
    profile.gpus.push(gpu(GPU_ID, false));
    let db = CompatibilityDb::from_entries(vec![gpu_entry(), wifi_entry()]);
    let tables = [dsdt()];

    let first = build_plan(&profile, &db, &tables).unwrap();
    let second = build_plan(&profile, &db, &tables).unwrap();
    assert_eq!(first, second);

    assert_eq!(
        first.driver_ids().filter(|id| *id == "igpu-framebuffer").count(),
        1
    );
    let mut seen = Vec::new();
    for d in &first.directives {
        assert!(!seen.contains(&d), "duplicate directive {d:?}");
        seen.push(d);
    }
}

#[test]
fn unknown_chipset_degrades_to_a_warning() {
    let db = CompatibilityDb::from_entries(vec![gpu_entry()]);
    let plan = build_plan(&profile(), &db, &[]).unwrap();
    assert!(plan
        .warnings
        .iter()
        .any(|w| w.subject == CHIPSET_ID.to_string()));
}
