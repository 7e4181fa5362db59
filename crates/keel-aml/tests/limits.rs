use keel_aml::{
    body, encode, AmlData, AmlEncodeError, AmlNode, AmlTable, NameSeg, DSDT_SIGNATURE,
    MAX_PKG_LENGTH, SSDT_SIGNATURE,
};

/// An edit that pushes a package past the 28-bit PkgLength maximum must fail
/// re-encoding, not silently truncate.
#[test]
fn oversized_method_body_fails_encode() {
    let table = AmlTable::new(
        DSDT_SIGNATURE,
        *b"KEELBIG ",
        vec![AmlNode::method("BIGM", 0, false, body::return_zero())],
    );
    let bytes = encode(&table).unwrap();
    let mut table = AmlTable::parse(&bytes).unwrap();

    table
        .root
        .descend_mut(&[NameSeg::new("BIGM")])
        .unwrap()
        .set_method_body(vec![0xA3; MAX_PKG_LENGTH]) // NoopOp filler
        .unwrap();

    match encode(&table) {
        Err(AmlEncodeError::PackageTooLarge { len }) => assert!(len > MAX_PKG_LENGTH),
        other => panic!("expected PackageTooLarge, got {other:?}"),
    }
}

#[test]
fn package_with_too_many_elements_fails_encode() {
    let elements = vec![AmlData::Integer(0); 256];
    let table = AmlTable::new(
        SSDT_SIGNATURE,
        *b"KEELBIG ",
        vec![AmlNode::name_value("BIGP", AmlData::Package(elements))],
    );
    assert_eq!(
        encode(&table),
        Err(AmlEncodeError::PackageCountOverflow { count: 256 })
    );
}
