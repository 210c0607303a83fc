//! Turns parsed inputs into groups whose members get pairwise edges.
//!
//! An identifier list is one group as a whole. A dump yields one group per
//! hash shared by two or more usernames, except the empty-password hash,
//! whose members are reported and never grouped.
use crate::credential::{Credential, HashGroups};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub members: Vec<String>,
}

impl Group {
    pub fn new(members: Vec<String>) -> Self {
        Self { members }
    }

    /// Members `member` gets an edge to: everyone whose name differs.
    pub fn peers<'a>(&'a self, member: &'a str) -> impl Iterator<Item = &'a str> {
        self.members
            .iter()
            .map(String::as_str)
            .filter(move |o| *o != member)
    }

    /// Number of ordered pairs the group produces.
    pub fn pair_count(&self) -> usize {
        self.members.iter().map(|m| self.peers(m).count()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    pub groups: Vec<Group>,
    /// Members of the empty-password bucket, one entry per bucket found.
    pub empty_password: Vec<Vec<String>>,
}

pub fn group_identifiers(identifiers: Vec<String>) -> Vec<Group> {
    vec![Group::new(identifiers)]
}

pub fn group_hashes(hashes: &HashGroups) -> Grouping {
    let mut out = Grouping::default();
    if let Some(users) = hashes.get(Credential::EMPTY_PASSWORD_NT) {
        out.empty_password.push(users.to_vec());
    }
    for (hash, users) in hashes.iter() {
        if users.len() > 1 && !Credential::is_empty_password(hash) {
            out.groups.push(Group::new(users.to_vec()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::{MalformedPolicy, parse_dump_contents};

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identifier_list_is_a_single_group() {
        let groups = group_identifiers(names(&["alice", "bob"]));
        assert_eq!(groups.len(), 1);
        let peers: Vec<_> = groups[0].peers("alice").collect();
        assert_eq!(peers, vec!["bob"]);
        assert_eq!(groups[0].pair_count(), 2);
    }

    #[test]
    fn small_groups_have_no_pairs() {
        assert_eq!(Group::new(vec![]).pair_count(), 0);
        assert_eq!(Group::new(names(&["solo"])).pair_count(), 0);
    }

    #[test]
    fn pair_count_is_n_times_n_minus_one() {
        let g = Group::new(names(&["a", "b", "c", "d"]));
        assert_eq!(g.pair_count(), 12);
    }

    #[test]
    fn duplicate_names_never_pair_with_themselves() {
        let g = Group::new(names(&["a", "b", "a"]));
        assert_eq!(g.peers("a").collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(g.peers("b").collect::<Vec<_>>(), vec!["a", "a"]);
        assert_eq!(g.pair_count(), 4);
    }

    #[test]
    fn dump_groups_exclude_singletons_and_empty_password() {
        let dump = "CORP\\carol:1:aad3b435b51404eeaad3b435b51404ee:aad3b435b51404eeaad3b435b51404ee\n\
                    CORP\\dave:2:aad3b435b51404eeaad3b435b51404ee:aad3b435b51404eeaad3b435b51404ee\n\
                    CORP\\eve:3:aad3b435b51404eeaad3b435b51404ee:31d6cfe0d16ae931b73c59d7e0c089c0\n\
                    CORP\\frank:4:aad3b435b51404eeaad3b435b51404ee:8846f7eaee8fb117ad06bdd830b7586c\n";
        let load = parse_dump_contents(dump, MalformedPolicy::Skip).unwrap();
        let grouping = group_hashes(&load.groups);
        assert_eq!(grouping.groups, vec![Group::new(names(&["carol", "dave"]))]);
        assert_eq!(grouping.empty_password, vec![names(&["eve"])]);
    }

    #[test]
    fn large_empty_password_bucket_is_still_excluded() {
        let dump = "a:1:x:31d6cfe0d16ae931b73c59d7e0c089c0\nb:2:x:31d6cfe0d16ae931b73c59d7e0c089c0\n";
        let load = parse_dump_contents(dump, MalformedPolicy::Skip).unwrap();
        let grouping = group_hashes(&load.groups);
        assert!(grouping.groups.is_empty());
        assert_eq!(grouping.empty_password, vec![names(&["a", "b"])]);
    }
}
