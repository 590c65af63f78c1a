use {
    alloy::primitives::Address,
    chrono::{DateTime, SecondsFormat, Utc},
    serde::{Deserialize, Deserializer, Serialize, Serializer},
};

/// Named constructor arguments a contract was deployed with. The registry
/// stores them verbatim and never interprets them.
pub type Args = serde_json::Map<String, serde_json::Value>;

/// A single deployed contract instance. Records are created once, when the
/// deployment happens, and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawRecord", try_from = "RawRecord")]
pub struct DeploymentRecord {
    /// Human readable label. Not unique.
    pub tag: Option<String>,
    /// The user facing address of the instance.
    pub address: Address,
    /// Implementation version derived from the creation bytecode, see
    /// [`crate::version::implementation_version`].
    pub version: String,
    pub date: DateTime<Utc>,
    pub args: Args,
    pub kind: Kind,
}

/// Distinguishes plain deployments from ones following an upgradable proxy
/// pattern. Only the latter have a separate implementation address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Fixed,
    Upgradable { implementation: Address },
}

impl DeploymentRecord {
    pub fn is_upgradable(&self) -> bool {
        matches!(self.kind, Kind::Upgradable { .. })
    }

    pub fn implementation(&self) -> Option<Address> {
        match self.kind {
            Kind::Fixed => None,
            Kind::Upgradable { implementation } => Some(implementation),
        }
    }
}

/// On-disk shape of a record. The upgradable flag and the implementation
/// address are separate fields there, so they have to be checked for
/// consistency when reading.
///
/// Addresses are written EIP-55 checksummed and dates with millisecond
/// precision, so existing registries survive a load and save unchanged.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    address: Checksummed,
    version: String,
    date: Timestamp,
    #[serde(default)]
    args: Args,
    is_upgradable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    implementation: Option<Checksummed>,
}

struct Checksummed(Address);

impl Serialize for Checksummed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_checksum(None))
    }
}

impl<'de> Deserialize<'de> for Checksummed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Address::deserialize(deserializer).map(Self)
    }
}

struct Timestamp(DateTime<Utc>);

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DateTime::<Utc>::deserialize(deserializer).map(Self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InconsistentRecord {
    #[error("upgradable deployment {0} has no implementation address")]
    MissingImplementation(Address),
    #[error("deployment {address} is not upgradable but has implementation {implementation}")]
    UnexpectedImplementation {
        address: Address,
        implementation: Address,
    },
}

impl From<DeploymentRecord> for RawRecord {
    fn from(record: DeploymentRecord) -> Self {
        Self {
            is_upgradable: record.is_upgradable(),
            implementation: record.implementation().map(Checksummed),
            tag: record.tag,
            address: Checksummed(record.address),
            version: record.version,
            date: Timestamp(record.date),
            args: record.args,
        }
    }
}

impl TryFrom<RawRecord> for DeploymentRecord {
    type Error = InconsistentRecord;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        let Checksummed(address) = raw.address;
        let kind = match (raw.is_upgradable, raw.implementation) {
            (true, Some(Checksummed(implementation))) => Kind::Upgradable { implementation },
            (true, None) => return Err(InconsistentRecord::MissingImplementation(address)),
            (false, None) => Kind::Fixed,
            (false, Some(Checksummed(implementation))) => {
                return Err(InconsistentRecord::UnexpectedImplementation {
                    address,
                    implementation,
                });
            }
        };
        Ok(Self {
            tag: raw.tag,
            address,
            version: raw.version,
            date: raw.date.0,
            args: raw.args,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address, serde_json::json};

    #[test]
    fn serializes_flat_upgradable_fields() {
        let address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
        let record = DeploymentRecord {
            tag: Some("tribe-token-prod".into()),
            address,
            version: "01".into(),
            date: "2021-06-01T12:00:00.123Z".parse().unwrap(),
            args: Args::new(),
            kind: Kind::Upgradable {
                implementation: address,
            },
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["isUpgradable"], json!(true));
        assert_eq!(value["implementation"], json!("0x5FbDB2315678afecb367f032d93F642f64180aa3"));
        assert_eq!(value["address"], value["implementation"]);
        assert_eq!(value["date"], json!("2021-06-01T12:00:00.123Z"));
        assert_eq!(value["args"], json!({}));

        let decoded: DeploymentRecord = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn dates_are_written_with_millisecond_precision() {
        let record = DeploymentRecord {
            tag: None,
            address: Address::repeat_byte(1),
            version: "05".into(),
            date: "2021-06-01T12:00:00Z".parse().unwrap(),
            args: Args::new(),
            kind: Kind::Fixed,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], json!("2021-06-01T12:00:00.000Z"));

        let precise = DeploymentRecord {
            date: "2021-06-01T12:00:34.777806551Z".parse().unwrap(),
            ..record
        };
        let value = serde_json::to_value(&precise).unwrap();
        assert_eq!(value["date"], json!("2021-06-01T12:00:34.777Z"));
    }

    #[test]
    fn fixed_records_omit_implementation() {
        let record = DeploymentRecord {
            tag: None,
            address: Address::repeat_byte(1),
            version: "02".into(),
            date: Utc::now(),
            args: json!({"owner": "0x0000000000000000000000000000000000000001"})
                .as_object()
                .unwrap()
                .clone(),
            kind: Kind::Fixed,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["isUpgradable"], json!(false));
        assert!(value.get("implementation").is_none());
        assert!(value.get("tag").is_none());
        assert_eq!(record.implementation(), None);
    }

    #[test]
    fn rejects_inconsistent_upgradable_flag() {
        let missing = json!({
            "address": "0x0101010101010101010101010101010101010101",
            "version": "03",
            "date": "2021-06-01T12:00:00Z",
            "args": {},
            "isUpgradable": true,
        });
        let err = serde_json::from_value::<DeploymentRecord>(missing).unwrap_err();
        assert!(err.to_string().contains("no implementation address"), "{err}");

        let unexpected = json!({
            "address": "0x0101010101010101010101010101010101010101",
            "version": "03",
            "date": "2021-06-01T12:00:00Z",
            "args": {},
            "isUpgradable": false,
            "implementation": "0x0202020202020202020202020202020202020202",
        });
        let err = serde_json::from_value::<DeploymentRecord>(unexpected).unwrap_err();
        assert!(err.to_string().contains("is not upgradable"), "{err}");
    }

    #[test]
    fn args_default_to_empty() {
        let record: DeploymentRecord = serde_json::from_value(json!({
            "tag": "v1",
            "address": "0x0101010101010101010101010101010101010101",
            "version": "04",
            "date": "2021-06-01T12:00:00Z",
            "isUpgradable": false,
        }))
        .unwrap();
        assert!(record.args.is_empty());
        assert_eq!(record.kind, Kind::Fixed);
    }
}
