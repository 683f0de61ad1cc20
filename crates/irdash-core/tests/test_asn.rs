use irdash_core::asn::{AsnRecord, MemberType};

#[test]
fn members_then_product_in_exact_order() {
    let members = vec!["m1".to_string(), "m2".to_string(), "m3".to_string()];
    let record = AsnRecord::build(&members, "iabc01");

    assert_eq!(record.len(), 4);
    assert_eq!(
        record
            .members
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>(),
        vec!["m1", "m2", "m3", "iabc01"]
    );
    assert_eq!(
        record.members.iter().map(|m| m.present).collect::<Vec<_>>(),
        vec![true, true, true, false]
    );
    assert_eq!(
        record
            .members
            .iter()
            .map(|m| m.mem_type)
            .collect::<Vec<_>>(),
        vec![
            MemberType::Contributing,
            MemberType::Contributing,
            MemberType::Contributing,
            MemberType::Product
        ]
    );
}

#[test]
fn empty_member_list_still_gets_a_product() {
    let record = AsnRecord::build(&[], "iabc01");
    assert_eq!(record.len(), 1);
    assert_eq!(record.members[0].mem_type, MemberType::Product);
    assert!(!record.members[0].present);
}

#[test]
fn member_types_use_the_downstream_wire_strings() {
    let record = AsnRecord::build(&["m1".to_string()], "iabc01");
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"EXP-DTH\""));
    assert!(json.contains("\"PROD-DTH\""));
}

#[test]
fn json_round_trip_preserves_the_record() {
    let members = vec!["iabc01_01".to_string(), "iabc01_02".to_string()];
    let record = AsnRecord::build(&members, "iabc01");
    let json = serde_json::to_string(&record).unwrap();
    let back: AsnRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}
