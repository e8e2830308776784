//! The function call graph: which functions a function calls via `invoke`.
//! Function-local passes run bottom-up over this graph (callees before
//! callers) so that, for example, `RemoveUnusedVariablesPass` has already
//! cleaned up a callee before the caller's inliner decision has to estimate
//! its size.

use rustc_hash::FxHashMap;

use crate::ir::{Context, FuncId, Opcode};

#[derive(Clone, Debug, Default)]
pub struct CallGraph {
    callees: FxHashMap<FuncId, Vec<FuncId>>,
}

impl CallGraph {
    pub fn compute(ctx: &Context) -> Self {
        let mut callees: FxHashMap<FuncId, Vec<FuncId>> = FxHashMap::default();
        for (caller_id, func) in ctx.functions() {
            let mut entry = Vec::new();
            for block in func.blocks() {
                for inst in func.layout.block_insts(block) {
                    let data = func.dfg.inst_data(inst);
                    if data.opcode != Opcode::Invoke {
                        continue;
                    }
                    if let Some(label) = data.operands.first().and_then(|o| o.as_label()) {
                        if let Some(callee_id) = ctx.function_by_name(label) {
                            entry.push(callee_id);
                        }
                    }
                }
            }
            callees.insert(caller_id, entry);
        }
        CallGraph { callees }
    }

    pub fn get_callees(&self, func: FuncId) -> &[FuncId] {
        self.callees.get(&func).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Walk the call graph from `entry`, visiting each reachable function
    /// exactly once, callees before the function that calls them (a
    /// postorder DFS) — the order `pipeline::run_function_passes` needs.
    pub fn bottom_up_order(&self, entry: FuncId) -> Vec<FuncId> {
        let mut visited = rustc_hash::FxHashSet::default();
        let mut order = Vec::new();
        self.visit(entry, &mut visited, &mut order);
        order
    }

    fn visit(&self, func: FuncId, visited: &mut rustc_hash::FxHashSet<FuncId>, order: &mut Vec<FuncId>) {
        if !visited.insert(func) {
            return;
        }
        for &callee in self.get_callees(func) {
            self.visit(callee, visited, order);
        }
        order.push(func);
    }
}
