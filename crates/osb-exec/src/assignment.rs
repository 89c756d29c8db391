//! Client-to-worker assignment:
//! given a list of hosts with core counts and a total client count, decides
//! which worker on which host hosts which clients.

use osb_core::ids::ClientId;

/// One host available to run workers, identified by name and core count.
#[derive(Debug, Clone)]
pub struct HostSpec {
    pub name: String,
    pub cores: usize,
}

impl HostSpec {
    pub fn new(name: impl Into<String>, cores: usize) -> Self {
        Self {
            name: name.into(),
            cores,
        }
    }
}

/// One worker's assignment: which host it runs on, its index within that
/// host, and the (possibly empty) list of global client ids it hosts.
///
/// Idle worker slots (this host has fewer clients than cores) still appear
/// here as an entry with an empty `client_ids`, so join-point rendezvous
/// counts stay stable across the whole workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub host: String,
    pub worker_index: usize,
    pub client_ids: Vec<ClientId>,
}

/// Splits `n` items into `parts` contiguous-length groups: the first
/// `n % parts` groups get `ceil(n / parts)` items, the rest get
/// `floor(n / parts)`. Returns the length of each group.
fn even_split(n: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = n / parts;
    let remainder = n % parts;
    (0..parts).map(|i| base + usize::from(i < remainder)).collect()
}

/// Workers per host equal that host's core count. Clients are distributed
/// in contiguous id blocks across hosts proportional to cores (largest-
/// remainder allocation keeps the total exact), and within a host are
/// packed into contiguous blocks across workers so uneven counts produce
/// `⌈C/W⌉` on the first few workers and `⌊C/W⌋` on the rest.
pub fn calculate_worker_assignments(hosts: &[HostSpec], total_clients: usize) -> Vec<WorkerAssignment> {
    let total_cores: usize = hosts.iter().map(|h| h.cores).sum();
    if total_cores == 0 {
        return Vec::new();
    }

    // largest-remainder method: exact floor share plus fractional remainder,
    // remainder slots handed to the hosts with the largest fractional parts.
    let shares: Vec<f64> = hosts
    .iter()
    .map(|h| total_clients as f64 * h.cores as f64 / total_cores as f64)
    .collect();
    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut remaining = total_clients - counts.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..hosts.len()).collect();
    order.sort_by(|&a, &b| {
            let frac_a = shares[a] - shares[a].floor();
            let frac_b = shares[b] - shares[b].floor();
            frac_b.partial_cmp(&frac_a).unwrap_or(std::cmp::Ordering::Equal)
        });
    for &host_index in order.iter() {
        if remaining == 0 {
            break;
        }
        counts[host_index] += 1;
        remaining -= 1;
    }

    let mut assignments = Vec::new();
    let mut next_client_id = 0usize;
    for (host, &host_client_count) in hosts.iter().zip(counts.iter()) {
        let per_worker = even_split(host_client_count, host.cores);
        for (worker_index, &worker_client_count) in per_worker.iter().enumerate() {
            let client_ids = (next_client_id..next_client_id + worker_client_count)
            .map(ClientId)
            .collect();
            next_client_id += worker_client_count;
            assignments.push(WorkerAssignment {
                    host: host.name.clone(),
                    worker_index,
                    client_ids,
                });
        }
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_client_is_assigned_exactly_once() {
        let hosts = vec![HostSpec::new("h1", 4), HostSpec::new("h2", 2)];
        let assignments = calculate_worker_assignments(&hosts, 10);
        let mut seen: Vec<usize> = assignments.iter().flat_map(|a| a.client_ids.iter().map(|c| c.0)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn workers_per_host_equal_core_count_even_when_idle() {
        let hosts = vec![HostSpec::new("h1", 4)];
        // fewer clients than cores: some worker slots must be idle (empty),
        // but there are still exactly `cores` entries for the host.
        let assignments = calculate_worker_assignments(&hosts, 2);
        assert_eq!(assignments.len(), 4);
        let idle = assignments.iter().filter(|a| a.client_ids.is_empty()).count();
        assert_eq!(idle, 2);
    }

    #[test]
    fn uneven_counts_pack_early_workers_first() {
        let hosts = vec![HostSpec::new("h1", 3)];
        // 7 clients over 3 workers -> 3, 2, 2
        let assignments = calculate_worker_assignments(&hosts, 7);
        let lens: Vec<usize> = assignments.iter().map(|a| a.client_ids.len()).collect();
        assert_eq!(lens, vec![3, 2, 2]);
    }

    #[test]
    fn clients_are_distributed_proportionally_to_cores() {
        let hosts = vec![HostSpec::new("big", 8), HostSpec::new("small", 2)];
        let assignments = calculate_worker_assignments(&hosts, 10);
        let big_count: usize = assignments.iter().filter(|a| a.host == "big").map(|a| a.client_ids.len()).sum();
        let small_count: usize = assignments.iter().filter(|a| a.host == "small").map(|a| a.client_ids.len()).sum();
        assert_eq!(big_count, 8);
        assert_eq!(small_count, 2);
    }

    #[test]
    fn zero_clients_produces_idle_workers_everywhere() {
        let hosts = vec![HostSpec::new("h1", 2)];
        let assignments = calculate_worker_assignments(&hosts, 0);
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|a| a.client_ids.is_empty()));
    }
}
