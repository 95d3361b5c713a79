//! The fixed cast of test accounts. Mnemonics are literal so that every run
//! derives the same addresses.

use empower_e2e_core::{AccAddress, AddressError};
use tracing::info;

use crate::identity::{hd, IdentityError, KeyRecord, Keyring, SigningIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestActor {
    Issuer,
    IssuerCreator,
    Applicant,
    Random,
    ContractAdmin,
    NoCoins,
}

impl TestActor {
    pub fn everyone() -> [Self; 6] {
        [
            TestActor::Issuer,
            TestActor::IssuerCreator,
            TestActor::Applicant,
            TestActor::Random,
            TestActor::ContractAdmin,
            TestActor::NoCoins,
        ]
    }

    /// Actors that get the standard starting balance.
    pub fn funded() -> [Self; 5] {
        [
            TestActor::Issuer,
            TestActor::IssuerCreator,
            TestActor::Applicant,
            TestActor::Random,
            TestActor::ContractAdmin,
        ]
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            TestActor::Issuer => "issuer",
            TestActor::IssuerCreator => "issuerCreator",
            TestActor::Applicant => "applicant",
            TestActor::Random => "randomKey",
            TestActor::ContractAdmin => "contractAdmin",
            TestActor::NoCoins => "nocoins",
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            TestActor::Issuer => "angry twist harsh drastic left brass behave host shove marriage fall update business leg direct reward object ugly security warm tuna model broccoli choice",
            TestActor::IssuerCreator => "clock post desk civil pottery foster expand merit dash seminar song memory figure uniform spice circle try happy obvious trash crime hybrid hood cushion",
            TestActor::Applicant => "banner spread envelope side kite person disagree path silver will brother under couch edit food venture squirrel civil budget number acquire point work mass",
            TestActor::Random => "pony olive still divide actual surge amateur funny marriage lizard radio gift basket supply sense feature early hazard carry smooth garment cream fury afford",
            TestActor::ContractAdmin => "verb vintage acquire turn opera surge coconut resemble pond salt sugar engage eager girl cram charge shove genre hurry park tone narrow damp novel",
            TestActor::NoCoins => "venture strong firm clap primary sample record ahead spin inherit skull daughter cherry relief estate maid squeeze charge hair produce animal discover margin edit",
        }
    }

    /// The address the mnemonic is known to derive to.
    pub fn address_str(&self) -> &'static str {
        match self {
            TestActor::Issuer => "empower1qnk2n4nlkpw9xfqntladh74w6ujtulwnz7rf8m",
            TestActor::IssuerCreator => "empower18hl5c9xn5dze2g50uaw0l2mr02ew57zkk9vga7",
            TestActor::Applicant => "empower1m9l358xunhhwds0568za49mzhvuxx9uxl4sqxn",
            TestActor::Random => "empower15hxwswcmmkasaar65n3vkmp6skurvtas3xzl7s",
            TestActor::ContractAdmin => "empower1reurz37gn2sk3vgr3fupcultkagzverqczer0l",
            TestActor::NoCoins => "empower1xgsaene8aqfknmldemvl5q0mtgcgjv9svupqwu",
        }
    }

    pub fn address(&self) -> Result<AccAddress, AddressError> {
        self.address_str().parse()
    }

    pub fn identity(&self) -> SigningIdentity {
        SigningIdentity::new(self.key_name(), self.mnemonic())
    }
}

/// Creates every test actor in `keyring`, checking each derived address
/// against its known value.
pub fn provision(
    keyring: &mut impl Keyring,
    passphrase: &str,
) -> Result<Vec<KeyRecord>, IdentityError> {
    let expected: Vec<_> = TestActor::everyone()
        .iter()
        .map(|x| (x.identity(), x.address_str()))
        .collect();

    let records = create_checked(keyring, &expected, passphrase)?;

    info!(count = records.len(), "provisioned test actors");

    Ok(records)
}

/// Creates `identities` only once every name is free and every derived
/// address matches; on error the keyring is left as it was.
fn create_checked(
    keyring: &mut impl Keyring,
    identities: &[(SigningIdentity, &str)],
    passphrase: &str,
) -> Result<Vec<KeyRecord>, IdentityError> {
    for (identity, expected) in identities {
        if keyring.get(&identity.name)?.is_some() {
            return Err(IdentityError::DuplicateIdentity(identity.name.clone()));
        }

        let key = hd::derive_key(
            &identity.mnemonic,
            passphrase,
            &identity.hd_path,
            identity.algorithm,
        )?;

        let derived = key.address().to_string();

        if derived != *expected {
            return Err(IdentityError::AddressMismatch {
                name: identity.name.clone(),
                expected: (*expected).to_owned(),
                derived,
            });
        }
    }

    identities
        .iter()
        .map(|(identity, _)| keyring.create(identity, passphrase))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{hd, MemoryKeyring, DEFAULT_BIP39_PASSPHRASE};

    #[test]
    fn literal_addresses_parse() {
        for actor in TestActor::everyone() {
            let parsed: AccAddress = actor.address_str().parse().unwrap();
            assert_eq!(parsed, actor.address().unwrap());
        }
    }

    #[test]
    fn mnemonics_derive_known_addresses() {
        for actor in TestActor::everyone() {
            let identity = actor.identity();

            let key = hd::derive_key(
                &identity.mnemonic,
                DEFAULT_BIP39_PASSPHRASE,
                &identity.hd_path,
                identity.algorithm,
            )
            .unwrap();

            assert_eq!(key.address(), actor.address().unwrap(), "{}", actor.key_name());
        }
    }

    #[test]
    fn provision_fills_keyring_once() {
        let mut keyring = MemoryKeyring::new();

        let records = provision(&mut keyring, DEFAULT_BIP39_PASSPHRASE).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(keyring.list().unwrap().len(), 6);

        assert!(matches!(
            provision(&mut keyring, DEFAULT_BIP39_PASSPHRASE),
            Err(IdentityError::DuplicateIdentity(_))
        ));
    }

    #[test]
    fn mismatch_leaves_keyring_untouched() {
        let mut keyring = MemoryKeyring::new();

        let identities = [
            (TestActor::Issuer.identity(), TestActor::Issuer.address_str()),
            (
                TestActor::Applicant.identity(),
                TestActor::Issuer.address_str(),
            ),
        ];

        let err = create_checked(&mut keyring, &identities, DEFAULT_BIP39_PASSPHRASE).unwrap_err();

        match err {
            IdentityError::AddressMismatch { name, derived, .. } => {
                assert_eq!(name, "applicant");
                assert_eq!(derived, TestActor::Applicant.address_str());
            }
            x => panic!("unexpected error {x:?}"),
        }

        assert!(keyring.list().unwrap().is_empty());
    }

    #[test]
    fn partial_duplicate_creates_nothing() {
        let mut keyring = MemoryKeyring::new();
        keyring
            .create(&TestActor::NoCoins.identity(), DEFAULT_BIP39_PASSPHRASE)
            .unwrap();

        assert!(matches!(
            provision(&mut keyring, DEFAULT_BIP39_PASSPHRASE),
            Err(IdentityError::DuplicateIdentity(name)) if name == "nocoins"
        ));
        assert_eq!(keyring.list().unwrap().len(), 1);
    }
}
