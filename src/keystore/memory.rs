use crate::error::Error;
use crate::keystore::key::{KeyRecord, StoredKey};
use crate::keystore::Keystore;
use std::collections::BTreeMap;
use trust_dns_client::rr::Name;

#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemoryKeystore {
    keys: BTreeMap<String, StoredKey>,
}

impl InMemoryKeystore {
    /// Store `key` under its keystore name, replacing any key of the same name.
    pub fn insert(&mut self, key: StoredKey) {
        self.keys.insert(key.record.name.clone(), key);
    }
}

#[async_trait::async_trait]
impl Keystore for InMemoryKeystore {
    async fn list_keys(&self) -> Result<Vec<KeyRecord>, Error> {
        Ok(self.keys.values().map(|key| key.record.clone()).collect())
    }

    async fn load_key(&self, name: &str) -> Result<StoredKey, Error> {
        self.keys
            .get(name.trim())
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn create_key(&mut self, fqdn: &Name) -> Result<StoredKey, Error> {
        let key = StoredKey::generate(fqdn.clone())?;
        self.insert(key.clone());
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn keys_are_listed_in_name_order() {
        let mut store = InMemoryKeystore::default();
        for name in ["b.example.com.", "a.example.com."] {
            store.create_key(&Name::from_str(name).unwrap()).await.unwrap();
        }
        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].name < keys[1].name);
    }

    #[tokio::test]
    async fn find_signing_key_skips_other_owners() {
        let mut store = InMemoryKeystore::default();
        let foo = Name::from_str("foo.example.com.").unwrap();
        let bar = Name::from_str("bar.example.com.").unwrap();
        let created = store.create_key(&foo).await.unwrap();

        let found = store.find_signing_key(&foo).await.unwrap().unwrap();
        assert_eq!(found.record, created.record);
        assert!(store.find_signing_key(&bar).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let store = InMemoryKeystore::default();
        assert!(matches!(
            store.load_key("Knope").await,
            Err(Error::NotFound(_))
        ));
    }
}
