//! The Allocator (component I): expands a test procedure's
//! schedule into a per-client sequence of [`TaskAllocation`] and
//! [`JoinPoint`] entries.

use crate::ids::JoinPointId;
use crate::task::ScheduleNode;
use std::collections::HashSet;
use std::sync::Arc;

/// Synthetic rendezvous node inserted between tasks. "Passed" only once
/// every client in the workload has reported arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPoint {
    pub id: JoinPointId,
    pub clients_executing_completing_task: HashSet<usize>,
    pub preceding_task_completes_parent: bool,
}

/// A client's slice of one task: which local index it occupies within the
/// task's own `[0, total_clients_of_task)` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAllocation {
    pub task_name: String,
    pub client_index_in_task: usize,
    pub global_client_index: usize,
    pub total_clients_of_task: usize,
}

/// One step in a client's allocation list: a join point, a task slice, or an
/// idle slot (this client does not participate in this step).
#[derive(Debug, Clone)]
pub enum AllocationEntry {
    Join(Arc<JoinPoint>),
    Task(TaskAllocation),
    Idle,
}

/// Output of the allocator: `allocations[client_id]` and the ordered join
/// points.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub client_lists: Vec<Vec<AllocationEntry>>,
    pub join_points: Vec<Arc<JoinPoint>>,
}

impl Allocation {
    pub fn total_clients(&self) -> usize {
        self.client_lists.len()
    }
}

/// Expands `schedule` into a per-client allocation.
///
/// Every client's list has length `2 * steps + 1`: the even positions
/// (`0, 2, 4,...`) are join points, the odd positions are task slices or
/// idle slots, one per schedule step.
pub fn allocate(schedule: &[ScheduleNode]) -> Allocation {
    let total_clients = schedule.iter().map(ScheduleNode::client_count).max().unwrap_or(0);

    let mut client_lists: Vec<Vec<AllocationEntry>> = (0..total_clients).map(|_| Vec::new()).collect();
    let mut join_points = Vec::new();

    let j0 = Arc::new(JoinPoint {
            id: JoinPointId(0),
            clients_executing_completing_task: HashSet::new(),
            preceding_task_completes_parent: false,
        });
    for list in &mut client_lists {
        list.push(AllocationEntry::Join(j0.clone()));
    }
    join_points.push(j0);

    for (step_index, node) in schedule.iter().enumerate() {
        let node_cap = node.client_count();
        let subtasks = node.tasks();

        // base contiguous blocks, one per subtask, in schedule order.
        let mut base_starts = Vec::with_capacity(subtasks.len());
        let mut cursor = 0usize;
        for task in &subtasks {
            base_starts.push(cursor);
            cursor += task.clients;
        }
        let base_sum = cursor;

        // per-subtask (local_index -> global client index) and running
        // count of clients assigned so far (base + extras).
        let mut per_subtask_globals: Vec<Vec<usize>> = subtasks.iter().map(|_| Vec::new()).collect();
        for (subtask_idx, task) in subtasks.iter().enumerate() {
            let start = base_starts[subtask_idx];
            for local in 0..task.clients {
                per_subtask_globals[subtask_idx].push(start + local);
            }
        }

        // extra clients beyond base_sum cycle round-robin over subtasks.
        if node_cap > base_sum && !subtasks.is_empty() {
            for global in base_sum..node_cap {
                let subtask_idx = (global - base_sum) % subtasks.len();
                per_subtask_globals[subtask_idx].push(global);
            }
        }

        let mut completing_clients = HashSet::new();
        for (subtask_idx, task) in subtasks.iter().enumerate() {
            let globals = &per_subtask_globals[subtask_idx];
            let total_clients_of_task = globals.len();
            for (local_index, &global) in globals.iter().enumerate() {
                client_lists[global].push(AllocationEntry::Task(TaskAllocation {
                            task_name: task.name.clone(),
                            client_index_in_task: local_index,
                            global_client_index: global,
                            total_clients_of_task,
                        }));
            }
            if task.completes_parent {
                completing_clients.extend(globals.iter().copied());
            }
        }

        // clients not touched by this node idle for this step.
        for global in 0..total_clients {
            let assigned = subtasks
            .iter()
            .enumerate()
            .any(|(idx, _)| per_subtask_globals[idx].contains(&global));
            if !assigned {
                client_lists[global].push(AllocationEntry::Idle);
            }
        }

        let join = Arc::new(JoinPoint {
                id: JoinPointId(step_index + 1),
                preceding_task_completes_parent: !completing_clients.is_empty(),
                clients_executing_completing_task: completing_clients,
            });
        for list in &mut client_lists {
            list.push(AllocationEntry::Join(join.clone()));
        }
        join_points.push(join);
    }

    Allocation {
        client_lists,
        join_points,
    }
}
