#![allow(dead_code)]

use std::sync::Arc;

use local_channel_core::{FormatMask, LocalConfig, LocalPvt, LocalTech, LOCAL_TYPE};
use local_channel_memory::{ChannelRef, MemoryHost};

pub struct Pair {
    pub owner: ChannelRef,
    pub chan: ChannelRef,
    pub pvt: Arc<LocalPvt<MemoryHost>>,
}

/// Host with Local registered and the usual test extensions in place.
pub fn setup() -> (Arc<MemoryHost>, Arc<LocalTech<MemoryHost>>) {
    let (host, local) = MemoryHost::with_local(LocalConfig::default()).unwrap();
    host.add_extension("internal", "100");
    host.add_extension("outbound", "700");
    (host, local)
}

pub fn create(host: &MemoryHost, local: &LocalTech<MemoryHost>, dest: &str) -> Pair {
    let owner = host.request(LOCAL_TYPE, dest, FormatMask::ULAW).unwrap();
    let pvt = local.private_of(&owner).unwrap();
    let chan = pvt.chan().unwrap();
    Pair { owner, chan, pvt }
}

/// Create a pair and launch its dialplan.
pub fn launched(host: &MemoryHost, local: &LocalTech<MemoryHost>, dest: &str) -> Pair {
    let pair = create(host, local, dest);
    host.place_call(&pair.owner, dest, None).unwrap();
    pair
}
