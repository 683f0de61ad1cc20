//! Association records: the manifest handed to the external alignment and
//! co-addition stage.

use serde::{Deserialize, Serialize};

/// Role of an association member. Serialized with the wire strings the
/// downstream drizzle stage expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    /// A contributing dithered exposure.
    #[serde(rename = "EXP-DTH")]
    Contributing,
    /// The combined product the alignment stage will populate.
    #[serde(rename = "PROD-DTH")]
    Product,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AsnMember {
    pub name: String,
    pub mem_type: MemberType,
    pub present: bool,
}

/// An ordered association: all difference-frame members first (present,
/// contributing), then the root as a non-present product placeholder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AsnRecord {
    pub root: String,
    pub members: Vec<AsnMember>,
}

impl AsnRecord {
    /// Package difference-frame names plus the shared root into a record.
    /// Input order is preserved; the product placeholder always comes last.
    pub fn build(member_names: &[String], root: &str) -> AsnRecord {
        let mut members: Vec<AsnMember> = member_names
            .iter()
            .map(|name| AsnMember {
                name: name.clone(),
                mem_type: MemberType::Contributing,
                present: true,
            })
            .collect();
        members.push(AsnMember {
            name: root.to_owned(),
            mem_type: MemberType::Product,
            present: false,
        });
        AsnRecord {
            root: root.to_owned(),
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
