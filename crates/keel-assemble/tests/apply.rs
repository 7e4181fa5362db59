//! End-to-end assembly over a hand-built plan and fixture table.

use serde_json::json;

use keel_aml::{
    body, sta_zero_override, AmlData, AmlNode, AmlObject, AmlPath, AmlTable, NameSeg, PathPattern,
    DSDT_SIGNATURE,
};
use keel_assemble::{assemble, AssembleError, ConfigTemplate, SUPPLEMENTAL_SSDT_NAME};
use keel_engine::{NodeEditOp, PatchDirective, PatchPlan};

fn fixture() -> AmlTable {
    AmlTable::new(
        DSDT_SIGNATURE,
        *b"FIXTURE ",
        vec![AmlNode::scope(
            "_SB",
            vec![AmlNode::device(
                "PCI0",
                vec![AmlNode::device(
                    "WIFI",
                    vec![
                        AmlNode::method("_STA", 0, false, body::return_integer(0x0F)),
                        AmlNode::name_value(
                            "_PRW",
                            AmlData::Package(vec![AmlData::Integer(0x0D), AmlData::Integer(0)]),
                        ),
                    ],
                )],
            )],
        )],
    )
}

fn path(s: &str) -> AmlPath {
    s.parse().unwrap()
}

fn plan() -> PatchPlan {
    PatchPlan {
        directives: vec![
            PatchDirective::PropertyOverride {
                key_path: "Kernel.Quirks.AppleXcpmCfgLock".to_owned(),
                value: json!(true),
            },
            PatchDirective::AcpiNodeEdit {
                table: 0,
                path: path("\\_SB.PCI0.WIFI._PRW"),
                op: NodeEditOp::SetPackageElement { index: 1, value: 3 },
            },
            PatchDirective::AcpiNodeEdit {
                table: 0,
                path: path("\\_SB.PCI0.WIFI._STA"),
                op: NodeEditOp::ReplaceMethodBody(body::return_zero()),
            },
            PatchDirective::AcpiNodeInsert {
                table: None,
                parent: AmlPath::root(),
                node: sta_zero_override(&path("\\_SB.TPM0")),
            },
            PatchDirective::DriverSelection {
                id: "audio".to_owned(),
                mandatory: false,
                load_hint: 0,
                depends_on: Some("lilu".to_owned()),
            },
            PatchDirective::DriverSelection {
                id: "lilu".to_owned(),
                mandatory: true,
                load_hint: 0,
                depends_on: None,
            },
        ],
        warnings: Vec::new(),
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

#[test]
fn plan_applies_and_reencodes() {
    let tables = [fixture()];
    let template = ConfigTemplate::new(json!({ "Boot": { "Timeout": 5 } })).unwrap();
    let out = assemble(&plan(), &template, &tables).unwrap();

    // Patched table re-encodes with a valid checksum and the edits in place.
    assert_eq!(out.tables.len(), 1);
    let dsdt = out.tables[0].as_deref().unwrap();
    assert_eq!(checksum(dsdt), 0);
    let patched = AmlTable::parse(dsdt).unwrap();
    let wifi = patched
        .root
        .descend(&[NameSeg::new("_SB"), NameSeg::new("PCI0"), NameSeg::new("WIFI")])
        .unwrap();
    match wifi.child(NameSeg::new("_STA")).unwrap().object() {
        AmlObject::Method { body: raw, .. } => {
            assert_eq!(body::decode_return_integer(raw), Some(0));
        }
        other => panic!("expected a method, got {other:?}"),
    }
    assert_eq!(
        wifi.child(NameSeg::new("_PRW")).unwrap().object(),
        &AmlObject::Name(AmlData::Package(vec![
            AmlData::Integer(0x0D),
            AmlData::Integer(3),
        ]))
    );

    // The supplemental SSDT exists, parses, and is referenced by the config.
    let ssdt = AmlTable::parse(out.supplemental_ssdt.as_deref().unwrap()).unwrap();
    let pat: PathPattern = "\\_SB.TPM0._STA".parse().unwrap();
    assert_eq!(keel_aml::find(&ssdt.root, &pat).count(), 1);
    let add = out.config.get("Acpi.Add").unwrap();
    assert_eq!(add[0]["Path"], json!(SUPPLEMENTAL_SSDT_NAME));

    // Config carries template content, overrides and the driver order.
    assert_eq!(out.config.get("Boot.Timeout"), Some(&json!(5)));
    assert_eq!(
        out.config.get("Kernel.Quirks.AppleXcpmCfgLock"),
        Some(&json!(true))
    );
    assert_eq!(out.drivers, vec!["lilu", "audio"]);
    assert_eq!(out.config.get("Drivers"), Some(&json!(["lilu", "audio"])));
}

#[test]
fn assembly_is_repeatable() {
    let tables = [fixture()];
    let template = ConfigTemplate::empty();
    let first = assemble(&plan(), &template, &tables).unwrap();
    let second = assemble(&plan(), &template, &tables).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.config.to_json_pretty(),
        second.config.to_json_pretty()
    );
}

#[test]
fn duplicate_insert_of_an_identical_node_is_a_no_op() {
    let tables = [fixture()];
    let insert = PatchDirective::AcpiNodeInsert {
        table: Some(0),
        parent: path("\\_SB.PCI0.WIFI"),
        node: AmlNode::name_value("XWAK", AmlData::Integer(1)),
    };
    let plan = PatchPlan {
        directives: vec![insert.clone(), insert],
        warnings: Vec::new(),
    };
    let out = assemble(&plan, &ConfigTemplate::empty(), &tables).unwrap();
    let patched = AmlTable::parse(out.tables[0].as_deref().unwrap()).unwrap();
    let pat: PathPattern = "\\_SB.PCI0.WIFI.XWAK".parse().unwrap();
    assert_eq!(keel_aml::find(&patched.root, &pat).count(), 1);
}

#[test]
fn untouched_tables_are_not_reencoded() {
    // The plan only edits table 0; table 1 must come back `None` so the
    // caller keeps its original bytes instead of a normalized re-encode.
    let extra = AmlTable::new(
        keel_aml::SSDT_SIGNATURE,
        *b"UNTOUCHD",
        vec![AmlNode::name_value("FOO_", AmlData::Integer(1))],
    );
    let tables = [fixture(), extra];
    let out = assemble(&plan(), &ConfigTemplate::empty(), &tables).unwrap();
    assert!(out.tables[0].is_some());
    assert_eq!(out.tables[1], None);
}

#[test]
fn missing_node_is_an_error() {
    let plan = PatchPlan {
        directives: vec![PatchDirective::AcpiNodeEdit {
            table: 0,
            path: path("\\_SB.PCI0.GONE"),
            op: NodeEditOp::SetNameInteger(0),
        }],
        warnings: Vec::new(),
    };
    assert!(matches!(
        assemble(&plan, &ConfigTemplate::empty(), &[fixture()]),
        Err(AssembleError::MissingNode { .. })
    ));
}

#[test]
fn out_of_range_table_index_is_an_error() {
    let plan = PatchPlan {
        directives: vec![PatchDirective::AcpiNodeEdit {
            table: 3,
            path: path("\\_SB"),
            op: NodeEditOp::SetNameInteger(0),
        }],
        warnings: Vec::new(),
    };
    assert_eq!(
        assemble(&plan, &ConfigTemplate::empty(), &[fixture()]),
        Err(AssembleError::NoSuchTable { index: 3, count: 1 })
    );
}
