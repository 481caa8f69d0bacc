//! Dead function elimination

use std::collections::{BTreeSet, VecDeque};

use ecow::EcoVec;

use crate::{Assembly, FuncSlice, Function, Instr};

/// Get the functions each function calls or passes to a modifier
///
/// The last entry is for the top-level code.
pub fn call_graph(asm: &Assembly) -> Vec<BTreeSet<usize>> {
    let referenced = |slice: &FuncSlice| -> BTreeSet<usize> {
        (asm.instrs.get(slice.start..slice.end()))
            .unwrap_or_default()
            .iter()
            .flat_map(Instr::functions)
            .collect()
    };
    (asm.functions.iter().map(|f| &f.slice))
        .chain([&asm.root])
        .map(referenced)
        .collect()
}

/// Get the functions reachable from the top-level code or an export
pub fn reachable(asm: &Assembly) -> BTreeSet<usize> {
    let graph = call_graph(asm);
    let root = graph.len() - 1;
    let mut seen = BTreeSet::new();
    let mut queue: VecDeque<usize> = graph[root].iter().copied().collect();
    queue.extend(asm.exports.values().copied());
    while let Some(func) = queue.pop_front() {
        if func >= root || !seen.insert(func) {
            continue;
        }
        queue.extend(graph[func].iter().copied());
    }
    seen
}

/// Remove every function that cannot be reached
///
/// Function indices are renumbered so that the kept functions stay in the
/// same order. The top-level code stays first in the instruction stream.
pub fn prune_unreachable(asm: &mut Assembly) {
    let keep = reachable(asm);
    if keep.len() == asm.functions.len() {
        return;
    }
    let mut remap = vec![usize::MAX; asm.functions.len()];
    for (new, &old) in keep.iter().enumerate() {
        remap[old] = new;
    }
    let relocate = |instrs: &mut EcoVec<Instr>, slice: FuncSlice| {
        let start = instrs.len();
        for instr in asm.instrs.get(slice.start..slice.end()).unwrap_or_default() {
            let mut instr = instr.clone();
            instr.map_functions(|f| remap.get(f).copied().unwrap_or(f));
            instrs.push(instr);
        }
        FuncSlice {
            start,
            len: slice.len,
        }
    };
    let mut instrs = EcoVec::new();
    let root = relocate(&mut instrs, asm.root);
    let functions: EcoVec<Function> = (keep.iter())
        .map(|&old| {
            let func = &asm.functions[old];
            Function {
                id: func.id.clone(),
                sig: func.sig,
                slice: relocate(&mut instrs, func.slice),
            }
        })
        .collect();
    for index in asm.exports.values_mut() {
        *index = remap.get(*index).copied().unwrap_or(*index);
    }
    tracing::debug!(
        removed = asm.functions.len() - functions.len(),
        "pruned unreachable functions"
    );
    asm.instrs = instrs;
    asm.root = root;
    asm.functions = functions;
    compact_tables(asm);
}

/// Drop the constants and spans that no instruction refers to
///
/// The entries that are kept stay in the same order.
fn compact_tables(asm: &mut Assembly) {
    let pushed = asm.instrs.iter().filter_map(|instr| match instr {
        Instr::Push(index) => Some(*index),
        _ => None,
    });
    let constant_map = renumber(asm.constants.len(), pushed);
    let span_map = renumber(asm.spans.len(), asm.instrs.iter().filter_map(Instr::span));
    let lookup = |map: &[Option<usize>], index: usize| map.get(index).copied().flatten();
    for instr in asm.instrs.make_mut() {
        if let Instr::Push(index) = instr {
            *index = lookup(&constant_map, *index).unwrap_or(*index);
        }
        if let Some(span) = instr.span_mut() {
            *span = lookup(&span_map, *span).unwrap_or(*span);
        }
    }
    tracing::debug!(
        constants = asm.constants.len(),
        spans = asm.spans.len(),
        "compacting tables"
    );
    asm.constants = retain_mapped(&asm.constants, &constant_map);
    asm.spans = retain_mapped(&asm.spans, &span_map);
}

/// Give each used index its position among the used indices
fn renumber(len: usize, used: impl IntoIterator<Item = usize>) -> Vec<Option<usize>> {
    let mut map = vec![None; len];
    for index in used {
        if let Some(slot) = map.get_mut(index) {
            *slot = Some(0);
        }
    }
    for (new, slot) in map.iter_mut().flatten().enumerate() {
        *slot = new;
    }
    map
}

fn retain_mapped<T: Clone>(items: &[T], map: &[Option<usize>]) -> EcoVec<T> {
    (items.iter().zip(map))
        .filter(|(_, new)| new.is_some())
        .map(|(item, _)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FunctionId, Primitive, Signature, Span, Value};

    fn function(name: &str, start: usize, len: usize) -> Function {
        Function {
            id: FunctionId::Named(name.into()),
            sig: Signature::new(0, 0),
            slice: FuncSlice { start, len },
        }
    }

    #[test]
    fn unreferenced_functions_are_removed() {
        // root: call B; A: call A; B: call C; C: empty
        let mut asm = Assembly {
            instrs: [Instr::Call(1, 0), Instr::Call(0, 0), Instr::Call(2, 0)]
                .into_iter()
                .collect(),
            functions: [function("A", 1, 1), function("B", 2, 1), function("C", 3, 0)]
                .into_iter()
                .collect(),
            root: FuncSlice { start: 0, len: 1 },
            ..Assembly::default()
        };
        assert_eq!(reachable(&asm), BTreeSet::from([1, 2]));
        prune_unreachable(&mut asm);
        let names: Vec<String> = asm.functions.iter().map(|f| f.id.to_string()).collect();
        assert_eq!(names, ["B", "C"]);
        assert_eq!(asm.root_instrs(), &[Instr::Call(0, 0)]);
        assert_eq!(asm.function_instrs(&asm.functions[0]), &[Instr::Call(1, 0)]);
        assert_eq!(asm.instrs.len(), 2);
    }

    #[test]
    fn exports_are_kept() {
        let mut asm = Assembly {
            instrs: [Instr::Call(1, 0)].into_iter().collect(),
            functions: [function("A", 0, 1), function("B", 1, 0), function("C", 1, 0)]
                .into_iter()
                .collect(),
            root: FuncSlice { start: 1, len: 0 },
            ..Assembly::default()
        };
        asm.exports.insert("A".into(), 0);
        prune_unreachable(&mut asm);
        assert_eq!(asm.functions.len(), 2);
        assert_eq!(asm.exports["A"], 0);
        assert_eq!(asm.function_instrs(&asm.functions[0]), &[Instr::Call(1, 0)]);
    }

    #[test]
    fn unused_constants_and_spans_are_removed() {
        // root: push 1, call B; A: push 0; B: push 2
        let mut asm = Assembly {
            instrs: [
                Instr::Push(1),
                Instr::Call(1, 2),
                Instr::Push(0),
                Instr::Prim(Primitive::Dup, 0),
                Instr::Push(2),
                Instr::Prim(Primitive::Pop, 1),
            ]
            .into_iter()
            .collect(),
            constants: [10i64, 11, 12].map(Value::from).into_iter().collect(),
            functions: [function("A", 2, 2), function("B", 4, 2)]
                .into_iter()
                .collect(),
            root: FuncSlice { start: 0, len: 2 },
            spans: [Span::Builtin, Span::Builtin, Span::Builtin].into_iter().collect(),
            ..Assembly::default()
        };
        prune_unreachable(&mut asm);
        assert_eq!(asm.constants.as_slice(), [Value::from(11i64), Value::from(12i64)]);
        assert_eq!(asm.spans.len(), 2);
        assert_eq!(asm.root_instrs(), &[Instr::Push(0), Instr::Call(0, 1)]);
        assert_eq!(
            asm.function_instrs(&asm.functions[0]),
            &[Instr::Push(1), Instr::Prim(Primitive::Pop, 0)]
        );
        assert!(asm.validate().is_ok());
    }
}
