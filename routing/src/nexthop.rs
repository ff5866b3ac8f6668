// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Object definitions for (shared) routing next-hops. These
//! refer to other objects like Encapsulation.

use crate::encapsulation::Encapsulation;
use std::cell::RefCell;
use std::cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd};
pub use std::collections::BTreeSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::net::IpAddr;
use std::option::Option;
pub use std::rc::Rc;
#[cfg(test)]
use std::str::FromStr;

#[derive(Debug)]
/// A collection of unique next-hops. Next-hops are identified by a next-hop key
/// that can contain an address, ifindex and encapsulation.
pub(crate) struct NhopStore(pub(crate) BTreeSet<Rc<Nhop>>);

#[derive(Debug, Eq)]
/// A next-hop object that can be shared by multiple routes and that can have
/// references to other next-hops in this (or other?) table.
pub(crate) struct Nhop {
    pub(crate) key: NhopKey,
    pub(crate) resolvers: RefCell<Vec<Rc<Nhop>>>,
}

#[derive(Debug, Default, Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum FwAction {
    #[default]
    Forward = 0,
    Drop = 1,
}

/// A struct acting as a key to next-hop objects. This should include the properties that
/// make a shared next-hop unique and distinguishable from the rest. This type is also used
/// as return value in next-hop resolution routines.
#[derive(Debug, Default, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct NhopKey {
    pub(crate) address: Option<IpAddr>,
    pub(crate) ifindex: Option<u32>,
    pub(crate) encap: Option<Encapsulation>,
    pub(crate) fwaction: FwAction,
}

#[allow(dead_code)]
impl NhopKey {
    //////////////////////////////////////////////////////////////////
    /// Build a next-hop key
    //////////////////////////////////////////////////////////////////
    pub fn new(
        address: Option<IpAddr>,
        ifindex: Option<u32>,
        encap: Option<Encapsulation>,
        fwaction: FwAction,
    ) -> Self {
        Self {
            address,
            ifindex,
            encap,
            fwaction,
        }
    }
    pub fn with_drop() -> Self {
        Self {
            address: None,
            ifindex: None,
            encap: None,
            fwaction: FwAction::Drop,
        }
    }
    #[cfg(test)]
    pub fn from_str(address: &str) -> Self {
        Self {
            address: Some(IpAddr::from_str(address).expect("Bad address")),
            ..Default::default()
        }
    }
    pub fn with_addr_ifindex(address: &IpAddr, ifindex: u32) -> Self {
        Self {
            address: Some(*address),
            ifindex: Some(ifindex),
            ..Default::default()
        }
    }
    pub fn with_address(address: &IpAddr) -> Self {
        Self {
            address: Some(*address),
            ..Default::default()
        }
    }
    pub fn with_ifindex(ifindex: u32) -> Self {
        Self {
            ifindex: Some(ifindex),
            ..Default::default()
        }
    }
}

/* Implement some traits needed to use Nhop as set element of BtreeSet. Since a Nhop can
   be internally mutated, we have to implement these manually to leave the resolvers out.
   The implementations leverage the derived trait implementations for the `NhopKey`
   (contained in the Nhop).
*/
impl PartialEq for Nhop {
    fn eq(&self, other: &Self) -> bool {
        self.key.eq(&other.key)
    }
}
impl Ord for Nhop {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}
impl PartialOrd for Nhop {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/* Hash is only needed if we use HashSet instead of BtreeSet for the NhopMap */
impl Hash for Nhop {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

#[allow(dead_code)]
#[allow(clippy::mutable_key_type)]
impl Nhop {
    //////////////////////////////////////////////////////////////////
    /// Create a new Nhop object from a key object
    //////////////////////////////////////////////////////////////////
    fn new_from_key(key: &NhopKey) -> Self {
        Self {
            key: *key,
            resolvers: RefCell::new(Vec::new()),
        }
    }

    //////////////////////////////////////////////////////////////////////////////////////////////////////
    /// Store a reference to some Nhop 'resolver' in the current next-hop Self.
    /// Note well:
    ///   * this increments/keeps the Rc count of the "resolver" since we're storing an Rc as parameter
    ///   * this should be called when we find out that Self resolves to 'resolver' according to some
    ///     routing table. Other than that, the reference has no semantics in this module, except that
    ///     the 'routing resolution' semantic is implicitly assumed in the functions that allow resolving
    ///     nexthops from such references. In other words, the "resolution" in this module will be as (in)
    ///     correct as those with explicit recursion, as long as the references are kept up to date.
    //////////////////////////////////////////////////////////////////////////////////////////////////////
    pub fn add_resolver(&self, resolver: Rc<Nhop>) -> &Self {
        self.resolvers.borrow_mut().push(resolver);
        self
    }

    /// Auxiliary recursive method used by Nhop::quick_resolve().
    fn quick_resolve_rec(&self, result: &mut BTreeSet<NhopKey>) {
        let resolvers_of_this = self.resolvers.borrow();

        if resolvers_of_this.len() == 0 {
            /* next-hop has no resolvers */
            if self.key.ifindex.is_some() || self.key.fwaction == FwAction::Drop {
                result.insert(self.key);
            } else {
                // This should not happen. The vrf will be such that there's always
                // a default route (with legitimate next-hops or a default one with action drop).
                // So all next-hops should resolve, at the very least, to the default route.
                // If we get here, we probably failed to update the resolution dependencies.
                panic!("Unable to resolve next-hop {:#?}", &self.key);
            }
        } else {
            /* check resolvers */
            for r in resolvers_of_this.iter() {
                if let Some(i) = r.key.ifindex {
                    /* Take into account that some nhops may already be partially resolved, meaning
                    they include an address AND an ifindex */
                    let address = r.key.address.map_or(self.key.address, |_| r.key.address);
                    result.insert(NhopKey::new(
                        address,
                        Some(i),
                        self.key.encap,
                        self.key.fwaction,
                    ));
                } else {
                    r.quick_resolve_rec(result);
                }
            }
        }
    }

    //////////////////////////////////////////////////////////////////////////////////////////////////////
    /// This method is just a proof of concept. The idea is that if the next-hop dependencies are up-to-date,
    /// a next-hop can be resolved by those. This allows us to replace an expensive LPM recursion (multiple LPMs)
    /// by a small recursion in the next-hop store, which is stateful and persists the results (to be done).
    //////////////////////////////////////////////////////////////////////////////////////////////////////
    pub fn quick_resolve(&self) -> BTreeSet<NhopKey> {
        let mut out: BTreeSet<NhopKey> = BTreeSet::new();
        self.quick_resolve_rec(&mut out);
        out
    }
}

#[allow(dead_code)]
impl NhopStore {
    //////////////////////////////////////////////////////////////////
    /// Create a next-hop map object.
    //////////////////////////////////////////////////////////////////
    pub(crate) fn new() -> Self {
        Self(BTreeSet::new())
    }

    //////////////////////////////////////////////////////////////////
    /// Get the number of next-hops in the store
    //////////////////////////////////////////////////////////////////
    pub fn len(&self) -> usize {
        self.0.len()
    }

    //////////////////////////////////////////////////////////////////
    /// Add a next hop with a given key (if it does not exist already)
    /// and return a shared reference to it.
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub(crate) fn add_nhop(&mut self, key: &NhopKey) -> Rc<Nhop> {
        let nh = Rc::new(Nhop::new_from_key(key));
        if let Some(e) = self.0.get(&nh) {
            Rc::clone(e)
        } else {
            let out = Rc::clone(&nh);
            self.0.insert(nh);
            out
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Tell if there exists a next-hop with a given key.
    //////////////////////////////////////////////////////////////////
    pub(crate) fn contains(&self, key: &NhopKey) -> bool {
        let nh = Nhop::new_from_key(key);
        self.0.contains(&nh)
    }

    //////////////////////////////////////////////////////////////////
    /// Get a reference to the next-hop with a given key, if it exists.
    /// Unlike add_nhop(), this returns a `&Rc<Nhop>` and not `Rc<Nhop>`,
    /// thereby not increasing the reference count of the next-hop.
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub(crate) fn get_nhop(&self, key: &NhopKey) -> Option<&Rc<Nhop>> {
        let nh = Nhop::new_from_key(key);
        self.0.get(&nh)
    }

    //////////////////////////////////////////////////////////////////
    /// Get the Rc count of the next-hop with the given key.
    /// This method may only used for testing.
    //////////////////////////////////////////////////////////////////
    #[cfg(test)]
    pub fn get_nhop_rc_count(&self, key: &NhopKey) -> usize {
        self.get_nhop(key).map_or(0, Rc::strong_count)
    }

    //////////////////////////////////////////////////////////////////
    /// Declare that a next-hop is no longer of our interest. The nhop may be removed or
    /// not, depending on whether there are other references to it. This function could
    /// just be self.map.remove(). However, that would just remove an Rc<Nhop> from the
    /// collection while other elements might have living references to it. We want the
    /// store to be and exhaustive, in that it should contain only living nexthops and
    /// all of them. I.e., no next-hop object should be alive outside of this collection.
    /// So, we'll remove elements from this collection iff no one refers to them.
    /// This should guarantee the uniqueness of next-hops and their referrals.
    pub(crate) fn del_nhop(&mut self, key: &NhopKey) {
        let target = Nhop::new_from_key(key);
        let mut remove: bool = false;
        if let Some(existing) = self.0.get(&target) {
            if Rc::strong_count(existing) == 1 {
                remove = true;
            }
        }
        if remove {
            /* Nobody refers to this next-hop, so we're good to remove it. We could happily call
               self.map.remove(): all the references to its resolvers will be gone too.
               But those resolvers may get one less reference and may need to be purged too, and
               by doing so, the next-hops used to resolve them ... So, we recourse. Nothing terribly
               bad would happen if we didn't. In principle all next-hops should stay alive as long
               as a route refers to them. This is just a sanity to protect against the race where a
               route is removed but its next-hop remains alive due to a referral and then that referral
               is gone, causing the next-hop to remain in the store.
            */
            if let Some(existing) = self.0.take(&target) {
                /* N.B. this mutable borrow should be "safe" in spite of the recursion because
                the only case where it wouldn't would be if borrow_xx() was called for the same
                nhop, but that should happen if its refcount is 1 and we don't keep other refs around */
                let mut resolvers = existing.resolvers.borrow_mut();
                while let Some(r) = resolvers.pop() {
                    let key = r.key; /* copy the key since we'll */
                    drop(r); /* ....drop the Rc */
                    self.del_nhop(&key);
                }
            }
        }
    }

    //////////////////////////////////////////////////////////////////
    /// Resolve a next-hop by address. If no next-hop exists for that
    /// address, returns None. Otherwise, it returns the result of
    /// quick_resolve() on the next-hop found.
    /// This function is probably only useful for testing.
    //////////////////////////////////////////////////////////////////
    #[cfg(test)]
    pub(crate) fn resolve_by_addr(&self, address: &IpAddr) -> Option<BTreeSet<NhopKey>> {
        let key = NhopKey::with_address(address);
        self.get_nhop(&key).map(|nh| nh.quick_resolve())
    }

    /// Dump the contents of the next-hop map
    #[cfg(test)]
    pub(crate) fn dump(&self) {
        print!("{self:#?}");
    }
}
