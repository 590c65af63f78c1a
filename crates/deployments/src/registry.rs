use {
    crate::{DeploymentRecord, Error},
    indexmap::IndexMap,
    serde::{Deserialize, Serialize},
    std::fmt::{self, Display, Formatter},
};

/// Name of the network a registry belongs to, for example `testnet`. Every
/// network gets its own registry file, so the name has to be usable as a
/// file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Network(String);

impl Network {
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(Error::InvalidNetwork(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deployment history of one network: contract type to its deployments,
/// oldest first. Both the contract types and the records keep their
/// insertion order through serialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry(IndexMap<String, Vec<DeploymentRecord>>);

impl Registry {
    /// Deployments of `contract_type`, oldest first. Empty if the type was
    /// never deployed.
    pub fn records(&self, contract_type: &str) -> &[DeploymentRecord] {
        self.0.get(contract_type).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn latest(&self, contract_type: &str) -> Option<&DeploymentRecord> {
        self.records(contract_type).last()
    }

    pub fn append(&mut self, contract_type: &str, record: DeploymentRecord) {
        self.0
            .entry(contract_type.to_string())
            .or_default()
            .push(record);
    }

    pub fn contract_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::Kind, alloy::primitives::Address, chrono::Utc};

    fn record(byte: u8) -> DeploymentRecord {
        DeploymentRecord {
            tag: Some(format!("tag-{byte}")),
            address: Address::repeat_byte(byte),
            version: format!("{byte:02x}"),
            date: Utc::now(),
            args: Default::default(),
            kind: Kind::Fixed,
        }
    }

    #[test]
    fn appends_in_order() {
        let mut registry = Registry::default();
        assert!(registry.is_empty());
        assert!(registry.records("tribe").is_empty());

        registry.append("tribe", record(1));
        registry.append("vault", record(2));
        registry.append("tribe", record(3));

        assert_eq!(registry.contract_types().collect::<Vec<_>>(), ["tribe", "vault"]);
        let addresses = registry
            .records("tribe")
            .iter()
            .map(|record| record.address)
            .collect::<Vec<_>>();
        assert_eq!(addresses, [Address::repeat_byte(1), Address::repeat_byte(3)]);
        assert_eq!(registry.latest("tribe").unwrap().address, Address::repeat_byte(3));
    }

    #[test]
    fn network_names_must_be_file_names() {
        assert_eq!(Network::new("testnet").unwrap().as_str(), "testnet");
        assert_eq!(Network::new("bsc-mainnet").unwrap().to_string(), "bsc-mainnet");
        for name in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(Network::new(name), Err(Error::InvalidNetwork(_))), "{name:?}");
        }
    }
}
