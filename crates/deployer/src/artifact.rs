//! Compiled contract artifacts as emitted by Hardhat or Foundry.

use {
    alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
        json_abi::JsonAbi,
        primitives::{Bytes, hex},
    },
    deployments::Args,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read artifact {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed artifact")]
    Json(#[from] serde_json::Error),
    #[error("artifact has no bytecode, is the contract abstract?")]
    EmptyBytecode,
    #[error("contract has no constructor but arguments {0:?} were given")]
    NoConstructor(Vec<String>),
    #[error("constructor input {0} has no name and cannot be matched to an argument")]
    UnnamedInput(usize),
    #[error("missing constructor argument {0:?}")]
    MissingArgument(String),
    #[error("unknown constructor argument {0:?}")]
    UnknownArgument(String),
    #[error("constructor argument {name:?} is not a valid {ty}")]
    InvalidArgument {
        name: String,
        ty: String,
        #[source]
        source: alloy::dyn_abi::Error,
    },
    #[error("failed to encode constructor arguments")]
    Encode(#[source] alloy::dyn_abi::Error),
}

#[derive(Clone, Debug)]
pub struct Artifact {
    pub contract_name: Option<String>,
    pub source_name: Option<String>,
    pub abi: JsonAbi,
    /// Creation bytecode, without constructor arguments.
    pub bytecode: Bytes,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(default)]
    contract_name: Option<String>,
    #[serde(default)]
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: RawBytecode,
}

/// Hardhat stores the bytecode as a hex string, Foundry as an object with
/// source maps and link references next to it.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(Bytes),
    Object { object: Bytes },
}

impl Artifact {
    pub async fn from_path(path: &Path) -> Result<Self, Error> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::Io {
                path: path.to_owned(),
                source,
            })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, Error> {
        let raw: RawArtifact = serde_json::from_str(data)?;
        let bytecode = match raw.bytecode {
            RawBytecode::Hex(bytes) | RawBytecode::Object { object: bytes } => bytes,
        };
        if bytecode.is_empty() {
            return Err(Error::EmptyBytecode);
        }
        Ok(Self {
            contract_name: raw.contract_name,
            source_name: raw.source_name,
            abi: raw.abi,
            bytecode,
        })
    }

    /// The `<source>:<contract>` name block explorers expect, if the artifact
    /// carries both parts.
    pub fn qualified_name(&self) -> Option<String> {
        Some(format!(
            "{}:{}",
            self.source_name.as_ref()?,
            self.contract_name.as_ref()?
        ))
    }

    /// ABI encodes the named `args` in the order of the constructor inputs.
    ///
    /// String values are parsed as the Solidity type of the matching input,
    /// any other JSON value is parsed from its JSON text, so `[1, 2]` works
    /// for a `uint256[]`.
    pub fn encode_constructor_args(&self, args: &Args) -> Result<Bytes, Error> {
        let Some(constructor) = &self.abi.constructor else {
            if args.is_empty() {
                return Ok(Bytes::new());
            }
            return Err(Error::NoConstructor(args.keys().cloned().collect()));
        };

        if let Some(unknown) = args
            .keys()
            .find(|name| !constructor.inputs.iter().any(|input| &input.name == *name))
        {
            return Err(Error::UnknownArgument(unknown.clone()));
        }

        let values = constructor
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                if input.name.is_empty() {
                    return Err(Error::UnnamedInput(index));
                }
                let value = args
                    .get(&input.name)
                    .ok_or_else(|| Error::MissingArgument(input.name.clone()))?;
                let text = match value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                let invalid = |source| Error::InvalidArgument {
                    name: input.name.clone(),
                    ty: input.ty.clone(),
                    source,
                };
                input.resolve().map_err(invalid)?.coerce_str(&text).map_err(invalid)
            })
            .collect::<Result<Vec<DynSolValue>, _>>()?;

        constructor
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(Error::Encode)
    }

    /// The deployment transaction input: bytecode followed by the encoded
    /// constructor arguments.
    pub fn creation_code(&self, constructor_args: &Bytes) -> Bytes {
        [&self.bytecode[..], &constructor_args[..]]
            .concat()
            .into()
    }
}

/// Hex representation of encoded constructor arguments without `0x`, as used
/// in explorer APIs.
pub fn encode_hex(constructor_args: &Bytes) -> String {
    hex::encode(constructor_args)
}
