//! The traversal state machine shared by the connectivity encoder and
//! decoder.
//!
//! The machine eats a closed, consistently wound 2-manifold one face at a
//! time. Its state is the cut border: the set of directed cycles separating
//! the visited region from the unvisited one, stored as doubly linked nodes
//! in an arena, plus an explicit stack of pending cycles. The active cycle's
//! gate is the edge between `gate` and its successor; every step attaches
//! the unvisited face across the gate and emits one [`Symbol`] describing
//! how that face's tip vertex relates to the border:
//!
//! * `C` — tip is a fresh vertex; it is spliced into the active cycle.
//! * `R` / `L` — tip is the border vertex right/left of the gate; one node
//!   retires.
//! * `E` — the active cycle is a triangle and the face closes it; the next
//!   pending cycle (if any) is popped.
//! * `S` — tip lies elsewhere on the active cycle; the cycle splits in two
//!   and one half is pushed. Carries the walk offset to the tip.
//! * `H` — tip lies on a pending cycle (a handle); that cycle is merged into
//!   the active one. Carries the stack position and walk offset.
//!
//! Both sides perform the identical splices through this one type, so the
//! decoder replays the encoder's traversal exactly, with no look-ahead,
//! assigning vertex ids in first-visit order.
//!
//! Directed-edge convention: faces are wound counterclockwise and a border
//! edge `(a -> b)` always has its visited face on the side containing the
//! reversed edge `(b -> a)`. The border cycle orientation follows from that
//! invariant; every splice below preserves it.

use thiserror::Error;

#[remain::sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineErr {
    #[error("border operation applied with no active cycle")]
    NoActiveCycle,
    #[error("stack position out of range")]
    StackOutOfRange,
    #[error("symbol is invalid for the current border shape")]
    SymbolMismatch,
    #[error("walk offset out of range")]
    WalkOutOfRange,
}

/// Traversal symbols. The wire ids double as entropy-coder symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Symbol {
    C,
    R,
    L,
    E,
    S,
    H,
}

pub(crate) const SYMBOL_ALPHABET: usize = 6;

impl Symbol {
    pub fn id(self) -> u32 {
        match self {
            Symbol::C => 0,
            Symbol::R => 1,
            Symbol::L => 2,
            Symbol::E => 3,
            Symbol::S => 4,
            Symbol::H => 5,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Symbol::C),
            1 => Some(Symbol::R),
            2 => Some(Symbol::L),
            3 => Some(Symbol::E),
            4 => Some(Symbol::S),
            5 => Some(Symbol::H),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    vert: u32,
    prev: u32,
    next: u32,
}

/// The cut border. Node handles index into an arena; retired nodes are
/// abandoned rather than freed, so handles held by the pending-cycle stack
/// stay valid for the whole run.
pub(crate) struct Border {
    nodes: Vec<Node>,
    gate: Option<u32>,
    stack: Vec<u32>,
}

impl Border {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            gate: None,
            stack: Vec::new(),
        }
    }

    pub fn gate(&self) -> Option<u32> {
        self.gate
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn stack_top(&self) -> Option<u32> {
        self.stack.last().copied()
    }

    pub fn vert(&self, node: u32) -> u32 {
        self.nodes[node as usize].vert
    }

    pub fn next_node(&self, node: u32) -> u32 {
        self.nodes[node as usize].next
    }

    pub fn prev_node(&self, node: u32) -> u32 {
        self.nodes[node as usize].prev
    }

    /// The vertices of the gate edge `(v(gate), v(next(gate)))`.
    pub fn gate_edge(&self) -> Result<(u32, u32), MachineErr> {
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        Ok((self.vert(g), self.vert(self.next_node(g))))
    }

    pub fn is_triangle(&self) -> Result<bool, MachineErr> {
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        Ok(self.next_node(self.next_node(gn)) == g)
    }

    fn push_node(&mut self, vert: u32, prev: u32, next: u32) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(Node { vert, prev, next });
        id
    }

    fn link(&mut self, from: u32, to: u32) {
        self.nodes[from as usize].next = to;
        self.nodes[to as usize].prev = from;
    }

    /// Starts a new component from the face `[a, b, c]`. The border becomes
    /// the cycle `a -> c -> b -> a` with the gate at `a`, i.e. the gate edge
    /// is `(a, c)`.
    pub fn init(&mut self, a: u32, b: u32, c: u32) -> Result<(), MachineErr> {
        if self.gate.is_some() {
            return Err(MachineErr::SymbolMismatch);
        }
        let base = self.nodes.len() as u32;
        self.push_node(a, base + 1, base + 2);
        self.push_node(b, base + 2, base);
        self.push_node(c, base, base + 1);
        self.gate = Some(base);
        Ok(())
    }

    /// Tip is the new vertex `w`; it is inserted between the gate nodes and
    /// becomes the new gate.
    pub fn apply_c(&mut self, w: u32) -> Result<(), MachineErr> {
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        let n = self.push_node(w, g, gn);
        self.link(g, n);
        self.link(n, gn);
        self.gate = Some(n);
        Ok(())
    }

    /// Tip is the vertex after the gate edge; the far gate node retires.
    /// Returns the tip vertex.
    pub fn apply_r(&mut self) -> Result<u32, MachineErr> {
        if self.is_triangle()? {
            return Err(MachineErr::SymbolMismatch);
        }
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        let nn = self.next_node(gn);
        let w = self.vert(nn);
        self.link(g, nn);
        Ok(w)
    }

    /// Tip is the vertex before the gate; the near gate node retires and the
    /// gate moves one step back. Returns the tip vertex.
    pub fn apply_l(&mut self) -> Result<u32, MachineErr> {
        if self.is_triangle()? {
            return Err(MachineErr::SymbolMismatch);
        }
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        let p = self.prev_node(g);
        let w = self.vert(p);
        self.link(p, gn);
        self.gate = Some(p);
        Ok(w)
    }

    /// The face closes the triangular active cycle. Pops the next pending
    /// cycle, or leaves the machine idle when the component is finished.
    /// Returns the tip vertex.
    pub fn apply_e(&mut self) -> Result<u32, MachineErr> {
        if !self.is_triangle()? {
            return Err(MachineErr::SymbolMismatch);
        }
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let x = self.next_node(self.next_node(g));
        let w = self.vert(x);
        self.gate = self.stack.pop();
        Ok(w)
    }

    /// Walks `steps` times along `next` from `from`, rejecting walks that
    /// wrap past the starting node.
    fn walk(&self, from: u32, steps: u64) -> Result<u32, MachineErr> {
        if steps > self.nodes.len() as u64 {
            return Err(MachineErr::WalkOutOfRange);
        }
        let mut cur = from;
        for _ in 0..steps {
            cur = self.next_node(cur);
            if cur == from {
                return Err(MachineErr::WalkOutOfRange);
            }
        }
        Ok(cur)
    }

    /// Tip is on the active cycle, `offset` steps past the far gate node.
    /// The cycle splits; the half behind the tip is pushed. Returns the tip
    /// vertex.
    pub fn apply_s(&mut self, offset: u64) -> Result<u32, MachineErr> {
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        if offset < 2 {
            return Err(MachineErr::WalkOutOfRange);
        }
        let m = self.walk(gn, offset)?;
        if m == g {
            return Err(MachineErr::WalkOutOfRange);
        }
        if m == self.prev_node(g) {
            return Err(MachineErr::SymbolMismatch);
        }
        let mp = self.prev_node(m);
        let mn = self.next_node(m);
        let w = self.vert(m);
        // Pending half: gn .. mp -> m1 -> gn; active half: g -> m2 -> mn .. p.
        let m1 = self.push_node(w, mp, gn);
        let m2 = self.push_node(w, g, mn);
        self.link(mp, m1);
        self.link(m1, gn);
        self.link(g, m2);
        self.link(m2, mn);
        self.stack.push(m1);
        Ok(w)
    }

    /// Tip is on a pending cycle: a handle. That cycle is removed from the
    /// stack and merged into the active one. `stack_pos` counts from the top
    /// of the stack; `offset` walks from the stored gate of that cycle.
    /// Returns the tip vertex.
    pub fn apply_h(&mut self, stack_pos: u64, offset: u64) -> Result<u32, MachineErr> {
        let g = self.gate.ok_or(MachineErr::NoActiveCycle)?;
        let gn = self.next_node(g);
        if stack_pos as usize >= self.stack.len() {
            return Err(MachineErr::StackOutOfRange);
        }
        let idx = self.stack.len() - 1 - stack_pos as usize;
        let gi = self.stack.remove(idx);
        let m = self.walk(gi, offset)?;
        let mp = self.prev_node(m);
        let mn = self.next_node(m);
        let w = self.vert(m);
        // Merged cycle: g -> m1 -> mn .. mp -> m2 -> gn .. p -> g.
        let m1 = self.push_node(w, g, mn);
        let m2 = self.push_node(w, mp, gn);
        self.link(g, m1);
        self.link(m1, mn);
        self.link(mp, m2);
        self.link(m2, gn);
        Ok(w)
    }

    /// Steps from the far gate node to `target` along the active cycle.
    /// Used by the encoder to derive split offsets.
    pub fn find_on_active(&self, target: u32) -> Option<u64> {
        let g = self.gate?;
        let gn = self.next_node(g);
        let mut cur = gn;
        let mut steps = 0_u64;
        loop {
            if cur == target {
                return Some(steps);
            }
            cur = self.next_node(cur);
            steps += 1;
            if cur == gn {
                return None;
            }
        }
    }

    /// Locates `target` on a pending cycle as (position from the stack top,
    /// steps from that cycle's stored gate).
    pub fn find_on_stack(&self, target: u32) -> Option<(u64, u64)> {
        for (i, &gi) in self.stack.iter().enumerate().rev() {
            let mut cur = gi;
            let mut steps = 0_u64;
            loop {
                if cur == target {
                    return Some(((self.stack.len() - 1 - i) as u64, steps));
                }
                cur = self.next_node(cur);
                steps += 1;
                if cur == gi {
                    break;
                }
            }
        }
        None
    }
}
