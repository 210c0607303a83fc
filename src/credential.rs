//! Credential entries read from a hash dump and the per-hash buckets built
//! from them.
//!
//! A dump line names an account as `DOMAIN\user` or plain `user`. Only the
//! bare username is kept: the operator supplies the domain used to qualify
//! names in the graph.
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One account and its password hash.
pub struct Credential {
    pub username: String,
    pub hash: String,
}

impl Credential {
    /// NT hash of the empty password.
    pub const EMPTY_PASSWORD_NT: &'static str = "31d6cfe0d16ae931b73c59d7e0c089c0";

    /// Build an entry from the raw account field (`DOMAIN\user` or `user`)
    /// and the hash field.
    pub fn from_dump_fields(account: &str, hash: &str) -> Self {
        // `A\B\C` keeps only the second segment.
        let username = match account.split('\\').nth(1) {
            Some(user) => user,
            None => account,
        };
        Self {
            username: username.to_string(),
            hash: hash.to_string(),
        }
    }

    pub fn is_empty_password(hash: &str) -> bool {
        hash == Self::EMPTY_PASSWORD_NT
    }
}

/// Usernames bucketed by identical hash. Buckets keep first-seen order and
/// usernames keep file order; duplicates within a bucket are retained.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HashGroups {
    index: HashMap<String, usize>,
    buckets: Vec<(String, Vec<String>)>,
}

impl HashGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, credential: Credential) {
        match self.index.get(&credential.hash) {
            Some(&i) => self.buckets[i].1.push(credential.username),
            None => {
                self.index
                    .insert(credential.hash.clone(), self.buckets.len());
                self.buckets
                    .push((credential.hash, vec![credential.username]));
            }
        }
    }

    pub fn get(&self, hash: &str) -> Option<&[String]> {
        self.index.get(hash).map(|&i| self.buckets[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(h, users)| (h.as_str(), users.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl FromIterator<Credential> for HashGroups {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        let mut groups = HashGroups::new();
        for c in iter {
            groups.insert(c);
        }
        groups
    }
}
