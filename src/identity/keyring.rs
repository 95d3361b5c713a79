use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use empower_e2e_core::AccAddress;

use super::{
    armor,
    hd::{self, Algorithm, KeyPair},
    IdentityError, SigningIdentity,
};

const RECORD_EXTENSION: &str = "json";

/// A stored signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    pub algorithm: Algorithm,
    pub address: AccAddress,
    pub public_key: String,

    /// `None` for keys that were imported rather than derived.
    #[serde(default)]
    pub hd_path: Option<String>,

    private_key: String,
}

impl KeyRecord {
    fn new(name: &str, algorithm: Algorithm, key: &KeyPair, hd_path: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            algorithm,
            address: key.address(),
            public_key: hex::encode(key.public_bytes()),
            hd_path: hd_path.map(str::to_owned),
            private_key: hex::encode(key.private_bytes()),
        }
    }

    pub fn key_pair(&self) -> Result<KeyPair, IdentityError> {
        let bytes = hex::decode(&self.private_key)
            .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

        KeyPair::from_private_bytes(&bytes)
    }

    /// Unarmored private key as hex.
    pub fn private_key_hex(&self) -> &str {
        &self.private_key
    }
}

fn check_name(name: &str) -> Result<(), IdentityError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        && !name.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(IdentityError::InvalidName(name.to_owned()))
    }
}

/// Named key storage. Implementors provide raw record access; key creation,
/// export and import are shared.
pub trait Keyring {
    fn get(&self, name: &str) -> Result<Option<KeyRecord>, IdentityError>;

    fn put(&mut self, record: KeyRecord) -> Result<(), IdentityError>;

    fn list(&self) -> Result<Vec<KeyRecord>, IdentityError>;

    fn key(&self, name: &str) -> Result<KeyRecord, IdentityError> {
        self.get(name)?
            .ok_or_else(|| IdentityError::NotFound(name.to_owned()))
    }

    /// Derives a key from `identity` and stores it under `identity.name`.
    fn create(
        &mut self,
        identity: &SigningIdentity,
        passphrase: &str,
    ) -> Result<KeyRecord, IdentityError> {
        check_name(&identity.name)?;

        if self.get(&identity.name)?.is_some() {
            return Err(IdentityError::DuplicateIdentity(identity.name.clone()));
        }

        let key = hd::derive_key(
            &identity.mnemonic,
            passphrase,
            &identity.hd_path,
            identity.algorithm,
        )?;

        let record = KeyRecord::new(
            &identity.name,
            identity.algorithm,
            &key,
            Some(&identity.hd_path),
        );

        debug!(name = %record.name, address = %record.address, "created key");
        self.put(record.clone())?;

        Ok(record)
    }

    fn export_armor(&self, name: &str, passphrase: &str) -> Result<String, IdentityError> {
        let record = self.key(name)?;
        let key = record.key_pair()?;

        armor::encrypt(&key.private_bytes(), record.algorithm, passphrase)
    }

    fn import_armor(
        &mut self,
        name: &str,
        armored: &str,
        passphrase: &str,
    ) -> Result<KeyRecord, IdentityError> {
        check_name(name)?;

        if self.get(name)?.is_some() {
            return Err(IdentityError::DuplicateIdentity(name.to_owned()));
        }

        let (private, algorithm) = armor::decrypt(armored, passphrase)?;
        let key = KeyPair::from_private_bytes(&private)?;
        let record = KeyRecord::new(name, algorithm, &key, None);

        debug!(name = %record.name, address = %record.address, "imported key");
        self.put(record.clone())?;

        Ok(record)
    }
}

/// Keyring that lives only as long as the value.
#[derive(Debug, Default)]
pub struct MemoryKeyring {
    records: BTreeMap<String, KeyRecord>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Keyring for MemoryKeyring {
    fn get(&self, name: &str) -> Result<Option<KeyRecord>, IdentityError> {
        Ok(self.records.get(name).cloned())
    }

    fn put(&mut self, record: KeyRecord) -> Result<(), IdentityError> {
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    fn list(&self) -> Result<Vec<KeyRecord>, IdentityError> {
        Ok(self.records.values().cloned().collect())
    }
}

/// Keyring persisted as one JSON file per key inside a directory, usually
/// `<node home>/harness-keyring`.
#[derive(Debug, Clone)]
pub struct FileKeyring {
    dir: PathBuf,
}

impl FileKeyring {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, IdentityError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(name).with_extension(RECORD_EXTENSION)
    }
}

fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;

        file.write_all(contents)
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
    }
}

impl Keyring for FileKeyring {
    fn get(&self, name: &str) -> Result<Option<KeyRecord>, IdentityError> {
        check_name(name)?;

        let path = self.record_path(name);

        if !path.is_file() {
            return Ok(None);
        }

        let raw = fs::read(&path)?;
        let record = serde_json::from_slice(&raw)?;

        Ok(Some(record))
    }

    fn put(&mut self, record: KeyRecord) -> Result<(), IdentityError> {
        check_name(&record.name)?;

        let raw = serde_json::to_vec_pretty(&record)?;
        write_private(&self.record_path(&record.name), &raw)?;

        Ok(())
    }

    fn list(&self) -> Result<Vec<KeyRecord>, IdentityError> {
        let mut records = vec![];

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();

            if path.extension().and_then(|x| x.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }

            let raw = fs::read(&path)?;
            records.push(serde_json::from_slice::<KeyRecord>(&raw)?);
        }

        records.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::TestActor;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut keyring = MemoryKeyring::new();
        let identity = TestActor::Issuer.identity();

        keyring.create(&identity, "").unwrap();

        assert!(matches!(
            keyring.create(&identity, ""),
            Err(IdentityError::DuplicateIdentity(name)) if name == "issuer"
        ));
    }

    #[test]
    fn file_keyring_persists_records() {
        let dir = tempfile::tempdir().unwrap();

        let created = {
            let mut keyring = FileKeyring::open(dir.path()).unwrap();
            keyring
                .create(&TestActor::Applicant.identity(), "")
                .unwrap()
        };

        let reopened = FileKeyring::open(dir.path()).unwrap();
        assert_eq!(reopened.key("applicant").unwrap(), created);
        assert_eq!(reopened.list().unwrap().len(), 1);
        assert!(matches!(
            reopened.key("issuer"),
            Err(IdentityError::NotFound(_))
        ));
    }

    #[test]
    fn armor_moves_keys_between_keyrings() {
        let mut source = MemoryKeyring::new();
        let mut target = MemoryKeyring::new();

        let original = source
            .create(&TestActor::Random.identity(), "")
            .unwrap();

        let armored = source.export_armor("randomKey", "").unwrap();
        let imported = target.import_armor("node1", &armored, "").unwrap();

        assert_eq!(imported.address, original.address);
        assert_eq!(imported.hd_path, None);
    }

    #[test]
    fn import_with_wrong_passphrase_fails() {
        let mut source = MemoryKeyring::new();
        source
            .create(&TestActor::Random.identity(), "")
            .unwrap();

        let armored = source.export_armor("randomKey", "secret").unwrap();

        let mut target = MemoryKeyring::new();
        assert!(matches!(
            target.import_armor("node1", &armored, "guess"),
            Err(IdentityError::Decryption)
        ));
        assert!(target.list().unwrap().is_empty());
    }

    #[test]
    fn path_like_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let keyring = FileKeyring::open(dir.path()).unwrap();

        assert!(matches!(
            keyring.get("../escape"),
            Err(IdentityError::InvalidName(_))
        ));
    }
}
