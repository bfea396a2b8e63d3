//! Net/connectivity resolution.
//!
//! Turns the circuit description's connectivity keys into a stable table of
//! numbered KiCad nets.
//!
//! # Algorithm
//!
//! 1. Every source net, source port, source trace and PCB trace becomes a
//!    member of a union–find forest together with the connectivity keys it
//!    carries. A source trace without a key gets `source_trace:<id>`, a PCB
//!    trace without a source trace gets `pcb_trace:<id>`.
//! 2. Source traces join their ports and nets; PCB trace wire endpoints join
//!    the port they start or end on. Pads on the same routed trace end up in
//!    the same group even when no key field is present anywhere.
//! 3. Each group is named by its smallest real key (synthetic keys only when
//!    the group has no real key). Groups are sorted by that key and numbered
//!    from 1. Net 0 is "no net".
//!
//! Lookups that cannot be resolved return net 0.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::unionfind::UnionFind;

use crate::circuit::{CircuitIndex, RoutePoint};
use crate::kicad::Sexpr;

/// Prefix of synthetic keys for source traces without a key.
pub const SOURCE_TRACE_KEY_PREFIX: &str = "source_trace:";

/// Prefix of synthetic keys for PCB traces without a source trace.
pub const PCB_TRACE_KEY_PREFIX: &str = "pcb_trace:";

/// A numbered KiCad net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInfo {
    /// Net number; 0 means "no net".
    pub id: u32,
    /// Net name; empty for net 0.
    pub name: String,
}

impl NetInfo {
    /// The reserved "no net" entry.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            id: 0,
            name: String::new(),
        }
    }

    /// Returns true for net 0.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.id == 0
    }

    /// Board-level declaration and pad reference: `(net 1 "GND")`.
    #[must_use]
    pub fn to_sexpr(&self) -> Sexpr {
        Sexpr::list(
            "net",
            [Sexpr::integer(self.id), Sexpr::string(self.name.clone())],
        )
    }

    /// Segment and via reference: `(net 1)`.
    #[must_use]
    pub fn id_sexpr(&self) -> Sexpr {
        Sexpr::list("net", [Sexpr::integer(self.id)])
    }
}

/// Resolved net table for one circuit.
#[derive(Debug, Clone)]
pub struct NetTable {
    nets: Vec<NetInfo>,
    by_key: HashMap<String, u32>,
    by_source_port: HashMap<String, u32>,
    by_source_net: HashMap<String, u32>,
    by_pcb_trace: HashMap<String, u32>,
    pcb_port_to_source_port: HashMap<String, String>,
}

impl NetTable {
    /// All nets, starting with net 0.
    #[must_use]
    pub fn nets(&self) -> &[NetInfo] {
        &self.nets
    }

    /// Number of nets, including net 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// Returns true if only net 0 exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nets.len() <= 1
    }

    /// The reserved "no net" entry.
    #[must_use]
    pub fn no_net(&self) -> &NetInfo {
        &self.nets[0]
    }

    fn get(&self, id: Option<&u32>) -> &NetInfo {
        id.and_then(|&id| self.nets.get(id as usize))
            .unwrap_or(&self.nets[0])
    }

    /// Net for a connectivity key (real or synthetic).
    #[must_use]
    pub fn net_for_key(&self, key: &str) -> &NetInfo {
        self.get(self.by_key.get(key))
    }

    /// Net for a source port.
    #[must_use]
    pub fn net_for_source_port(&self, source_port_id: &str) -> &NetInfo {
        self.get(self.by_source_port.get(source_port_id))
    }

    /// Net for a source net.
    #[must_use]
    pub fn net_for_source_net(&self, source_net_id: &str) -> &NetInfo {
        self.get(self.by_source_net.get(source_net_id))
    }

    /// Net for a PCB port, through its source port.
    #[must_use]
    pub fn net_for_pcb_port(&self, pcb_port_id: &str) -> &NetInfo {
        self.pcb_port_to_source_port
            .get(pcb_port_id)
            .map_or(&self.nets[0], |sp| self.net_for_source_port(sp))
    }

    /// Net carried by a PCB trace.
    #[must_use]
    pub fn net_for_pcb_trace(&self, pcb_trace_id: &str) -> &NetInfo {
        self.get(self.by_pcb_trace.get(pcb_trace_id))
    }
}

/// Union–find members.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Member {
    Key(String),
    SourcePort(String),
    SourceNet(String),
}

/// Collects members and joins before the forest is built.
#[derive(Default)]
struct Forest {
    members: Vec<Member>,
    index: HashMap<Member, usize>,
    joins: Vec<(usize, usize)>,
}

impl Forest {
    fn node(&mut self, member: Member) -> usize {
        if let Some(&i) = self.index.get(&member) {
            return i;
        }
        let i = self.members.len();
        self.members.push(member.clone());
        self.index.insert(member, i);
        i
    }

    fn join(&mut self, a: Member, b: Member) {
        let a = self.node(a);
        let b = self.node(b);
        self.joins.push((a, b));
    }
}

/// Builds [`NetTable`]s from circuit descriptions.
pub struct NetResolver;

impl NetResolver {
    /// Resolves every net in the circuit.
    #[must_use]
    pub fn resolve(circuit: &CircuitIndex) -> NetTable {
        let mut forest = Forest::default();
        let mut pcb_trace_keys: Vec<(String, String)> = Vec::new();
        let mut source_trace_keys: HashMap<&str, String> = HashMap::new();

        for net in circuit.source_nets() {
            let member = Member::SourceNet(net.source_net_id.clone());
            forest.node(member.clone());
            if let Some(key) = non_empty(net.subcircuit_connectivity_map_key.as_deref()) {
                forest.join(member, Member::Key(key.to_string()));
            }
        }

        for port in circuit.source_ports() {
            let member = Member::SourcePort(port.source_port_id.clone());
            forest.node(member.clone());
            if let Some(key) = non_empty(port.subcircuit_connectivity_map_key.as_deref()) {
                forest.join(member, Member::Key(key.to_string()));
            }
        }

        for trace in circuit.source_traces() {
            let key = non_empty(trace.subcircuit_connectivity_map_key.as_deref()).map_or_else(
                || format!("{SOURCE_TRACE_KEY_PREFIX}{}", trace.source_trace_id),
                str::to_string,
            );
            let key_member = Member::Key(key.clone());
            forest.node(key_member.clone());
            for port_id in &trace.connected_source_port_ids {
                forest.join(key_member.clone(), Member::SourcePort(port_id.clone()));
            }
            for net_id in &trace.connected_source_net_ids {
                forest.join(key_member.clone(), Member::SourceNet(net_id.clone()));
            }
            source_trace_keys.insert(&trace.source_trace_id, key);
        }

        for trace in circuit.pcb_traces() {
            let key = trace
                .source_trace_id
                .as_deref()
                .and_then(|id| source_trace_keys.get(id).cloned())
                .unwrap_or_else(|| format!("{PCB_TRACE_KEY_PREFIX}{}", trace.pcb_trace_id));
            let key_member = Member::Key(key.clone());
            forest.node(key_member.clone());

            for point in &trace.route {
                let RoutePoint::Wire(wire) = point else {
                    continue;
                };
                for pcb_port_id in [&wire.start_pcb_port_id, &wire.end_pcb_port_id]
                    .into_iter()
                    .flatten()
                {
                    if let Some(port) = circuit.pcb_port(pcb_port_id) {
                        forest.join(
                            key_member.clone(),
                            Member::SourcePort(port.source_port_id.clone()),
                        );
                    }
                }
            }
            pcb_trace_keys.push((trace.pcb_trace_id.clone(), key));
        }

        let mut table = Self::number_groups(circuit, &forest);
        for (trace_id, key) in pcb_trace_keys {
            let id = table.by_key.get(&key).copied().unwrap_or(0);
            table.by_pcb_trace.insert(trace_id, id);
        }
        table.pcb_port_to_source_port = circuit
            .pcb_ports()
            .iter()
            .map(|p| (p.pcb_port_id.clone(), p.source_port_id.clone()))
            .collect();
        table
    }

    fn number_groups(circuit: &CircuitIndex, forest: &Forest) -> NetTable {
        let mut sets = UnionFind::<usize>::new(forest.members.len());
        for &(a, b) in &forest.joins {
            sets.union(a, b);
        }

        // root -> members, ordered so the first key is the canonical one
        let mut groups: BTreeMap<usize, BTreeSet<&Member>> = BTreeMap::new();
        for (i, member) in forest.members.iter().enumerate() {
            groups.entry(sets.find(i)).or_default().insert(member);
        }

        let mut keyed: Vec<(String, Vec<&Member>)> = groups
            .into_values()
            .filter_map(|members| {
                let canonical = canonical_key(&members)?;
                Some((canonical, members.into_iter().collect()))
            })
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut table = NetTable {
            nets: vec![NetInfo::none()],
            by_key: HashMap::new(),
            by_source_port: HashMap::new(),
            by_source_net: HashMap::new(),
            by_pcb_trace: HashMap::new(),
            pcb_port_to_source_port: HashMap::new(),
        };
        let mut used_names: BTreeSet<String> = BTreeSet::new();

        for (canonical, members) in keyed {
            #[allow(clippy::cast_possible_truncation)] // Net count is far below u32::MAX
            let id = table.nets.len() as u32;
            let mut name = group_name(circuit, &canonical, &members);
            if name.is_empty() || used_names.contains(&name) {
                name = format!("{name}_{id}");
            }
            used_names.insert(name.clone());

            for member in members {
                match member {
                    Member::Key(key) => table.by_key.insert(key.clone(), id),
                    Member::SourcePort(port) => table.by_source_port.insert(port.clone(), id),
                    Member::SourceNet(net) => table.by_source_net.insert(net.clone(), id),
                };
            }
            table.nets.push(NetInfo { id, name });
        }

        table
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_synthetic(key: &str) -> bool {
    key.starts_with(SOURCE_TRACE_KEY_PREFIX) || key.starts_with(PCB_TRACE_KEY_PREFIX)
}

/// Smallest real key of a group, else its smallest synthetic key.
fn canonical_key(members: &BTreeSet<&Member>) -> Option<String> {
    let keys = members.iter().filter_map(|m| match m {
        Member::Key(k) => Some(k.as_str()),
        _ => None,
    });
    let (real, synthetic): (Vec<&str>, Vec<&str>) = keys.partition(|k| !is_synthetic(k));
    real.into_iter()
        .min()
        .or_else(|| synthetic.into_iter().min())
        .map(str::to_string)
}

fn group_name(circuit: &CircuitIndex, canonical: &str, members: &[&Member]) -> String {
    let mut net_names: Vec<&str> = members
        .iter()
        .filter_map(|m| match m {
            Member::SourceNet(id) => circuit.source_net(id).map(|n| n.name.as_str()),
            _ => None,
        })
        .filter(|n| !n.is_empty())
        .collect();
    net_names.sort_unstable();
    if let Some(name) = net_names.first() {
        return (*name).to_string();
    }

    // Members are sorted, so the first port is stable across runs
    let first_port = members.iter().find_map(|m| match m {
        Member::SourcePort(id) => circuit.source_port(id),
        _ => None,
    });
    if let Some(port) = first_port {
        let component = circuit
            .source_component(&port.source_component_id)
            .map_or("U", |c| c.name.as_str());
        let pad = port
            .pin_number
            .map_or_else(|| port.name.clone(), |n| n.to_string());
        return format!("Net-({component}-Pad{pad})");
    }

    canonical.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit(json: &str) -> CircuitIndex {
        CircuitIndex::from_json(json).unwrap()
    }

    const PORTS: &str = r#"
        {"type": "source_component", "source_component_id": "sc0", "name": "R1"},
        {"type": "source_port", "source_port_id": "sp0", "source_component_id": "sc0", "name": "pin1", "pin_number": 1},
        {"type": "source_port", "source_port_id": "sp1", "source_component_id": "sc0", "name": "pin2", "pin_number": 2},
        {"type": "source_component", "source_component_id": "sc1", "name": "R2"},
        {"type": "source_port", "source_port_id": "sp2", "source_component_id": "sc1", "name": "pin1", "pin_number": 1},
        {"type": "source_port", "source_port_id": "sp3", "source_component_id": "sc1", "name": "pin2", "pin_number": 2}
    "#;

    #[test]
    fn keyed_traces_and_nets() {
        let c = circuit(&format!(
            r#"[{PORTS},
            {{"type": "source_net", "source_net_id": "n0", "name": "GND", "subcircuit_connectivity_map_key": "k_gnd"}},
            {{"type": "source_trace", "source_trace_id": "t0", "connected_source_port_ids": ["sp0"],
              "connected_source_net_ids": ["n0"], "subcircuit_connectivity_map_key": "k_gnd"}},
            {{"type": "source_trace", "source_trace_id": "t1", "connected_source_port_ids": ["sp1", "sp2"],
              "subcircuit_connectivity_map_key": "k_sig"}}
            ]"#
        ));
        let table = NetResolver::resolve(&c);

        assert_eq!(table.len(), 3);
        let gnd = table.net_for_source_port("sp0");
        assert_eq!(gnd.name, "GND");
        assert_eq!(gnd.id, 1);
        let sig = table.net_for_source_port("sp1");
        assert_eq!(sig.id, 2);
        assert_eq!(table.net_for_source_port("sp2"), sig);
        assert_eq!(sig.name, "Net-(R1-Pad2)");
        assert!(table.net_for_source_port("sp3").is_none());
        assert_eq!(table.net_for_key("k_gnd").id, 1);
    }

    #[test]
    fn missing_keys_fall_back_to_trace() {
        let c = circuit(&format!(
            r#"[{PORTS},
            {{"type": "source_trace", "source_trace_id": "t0", "connected_source_port_ids": ["sp0", "sp3"]}}
            ]"#
        ));
        let table = NetResolver::resolve(&c);
        let net = table.net_for_source_port("sp0");
        assert!(!net.is_none());
        assert_eq!(table.net_for_source_port("sp3"), net);
        assert_eq!(table.net_for_key("source_trace:t0"), net);
    }

    #[test]
    fn pcb_trace_endpoints_join_ports() {
        let c = circuit(&format!(
            r#"[{PORTS},
            {{"type": "pcb_port", "pcb_port_id": "pp0", "source_port_id": "sp1", "x": 0, "y": 0}},
            {{"type": "pcb_port", "pcb_port_id": "pp1", "source_port_id": "sp2", "x": 5, "y": 0}},
            {{"type": "pcb_trace", "pcb_trace_id": "pt0", "route": [
                {{"route_type": "wire", "x": 0, "y": 0, "width": 0.2, "layer": "top", "start_pcb_port_id": "pp0"}},
                {{"route_type": "wire", "x": 5, "y": 0, "width": 0.2, "layer": "top", "end_pcb_port_id": "pp1"}}
            ]}}
            ]"#
        ));
        let table = NetResolver::resolve(&c);
        let net = table.net_for_pcb_port("pp0");
        assert!(!net.is_none());
        assert_eq!(table.net_for_pcb_port("pp1"), net);
        assert_eq!(table.net_for_pcb_trace("pt0"), net);
        assert!(table.net_for_source_port("sp0").is_none());
    }

    #[test]
    fn unconnected_circuit_has_only_net_zero() {
        let c = circuit(&format!("[{PORTS}]"));
        let table = NetResolver::resolve(&c);
        assert!(table.is_empty());
        assert!(table.net_for_pcb_port("nope").is_none());
        assert_eq!(table.no_net().name, "");
    }

    #[test]
    fn duplicate_net_names_get_suffix() {
        let c = circuit(
            r#"[
            {"type": "source_net", "source_net_id": "n0", "name": "VCC", "subcircuit_connectivity_map_key": "a"},
            {"type": "source_net", "source_net_id": "n1", "name": "VCC", "subcircuit_connectivity_map_key": "b"}
            ]"#,
        );
        let table = NetResolver::resolve(&c);
        assert_eq!(table.net_for_key("a").name, "VCC");
        assert_eq!(table.net_for_key("b").name, "VCC_2");
    }

    #[test]
    fn numbering_is_sorted_by_key() {
        let c = circuit(
            r#"[
            {"type": "source_net", "source_net_id": "n0", "name": "B", "subcircuit_connectivity_map_key": "zz"},
            {"type": "source_net", "source_net_id": "n1", "name": "A", "subcircuit_connectivity_map_key": "aa"}
            ]"#,
        );
        let table = NetResolver::resolve(&c);
        assert_eq!(table.net_for_key("aa").id, 1);
        assert_eq!(table.net_for_key("zz").id, 2);
    }
}
