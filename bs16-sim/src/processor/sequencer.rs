use crate::error::{SimulationError, SimulationErrorKind, SimulationResult};

/// Maximum number of return addresses the sequencer can hold.
pub const STACK_DEPTH: usize = 5;

bit_enum! {
    /// Microsequencer opcodes. `Reset` clears the stack and restarts from micro-address 0.
    #[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
    pub enum ControllerInstruction : 0b1111 >> 0 {
        Reset   = 0b0000 => "reset",
        Cjs     = 0b0001 => "cjs",
        Jmap    = 0b0010 => "jmap",
        Cjp     = 0b0011 => "cjp",
        Push    = 0b0100 => "push",
        Crtn    = 0b1010 => "crtn",
        Cjpp    = 0b1011 => "cjpp",
        Cont    = 0b1110 => "cont",
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SequencerStack {
    stack: [u16; STACK_DEPTH],
    pointer: usize
}
impl SequencerStack {
    pub fn new() -> Self {
        SequencerStack {
            stack: [0; STACK_DEPTH],
            pointer: 0
        }
    }

    pub fn push(&mut self, address: u16) -> SimulationResult<()> {
        if self.is_full() {
            Err(SimulationError::with_detail(
                SimulationErrorKind::StackOverflow,
                format!("cannot push {:#05X}", address)
            ))
        } else {
            self.stack[self.pointer] = address;
            self.pointer += 1;
            Ok(())
        }
    }

    pub fn pop(&mut self) -> SimulationResult<u16> {
        if self.is_empty() {
            Err(SimulationError::from(SimulationErrorKind::StackUnderflow))
        } else {
            self.pointer -= 1;
            Ok(self.stack[self.pointer])
        }
    }

    pub fn clear(&mut self) {
        self.pointer = 0;
    }

    pub fn is_full(&self) -> bool {
        self.pointer == STACK_DEPTH
    }

    pub fn is_empty(&self) -> bool {
        self.pointer == 0
    }

    pub fn len(&self) -> usize {
        self.pointer
    }

    /// Live entries, bottom of the stack first.
    pub fn as_slice(&self) -> &[u16] {
        &self.stack[..self.pointer]
    }
}

/// Next-address logic of the microsequencer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct ControlUnit {
    mic: u16,
    stack: SequencerStack
}
impl ControlUnit {
    pub fn new() -> Self {
        ControlUnit {
            mic: 0,
            stack: SequencerStack::new()
        }
    }

    pub fn micro_address(&self) -> u16 {
        self.mic
    }

    pub fn stack(&self) -> &SequencerStack {
        &self.stack
    }

    /// Computes and commits the next micro-address.
    ///
    /// `cond` holds when the condition is enabled and the tested flag is *false*; a true `cond`
    /// always falls through to `mic + 1`. On error the micro-address is left untouched.
    pub fn step(&mut self, instruction: u8, bar: u16, ccen: bool, condition: bool, mapped_address: u16) -> SimulationResult<u16> {
        let instruction = ControllerInstruction::decode(u32::from(instruction))
            .ok_or_else(|| SimulationError::with_detail(
                SimulationErrorKind::InvalidControllerInstruction,
                format!("{:#06b}", instruction)
            ))?;
        let cond = ccen && !condition;
        let next = self.mic.wrapping_add(1);

        let target = match instruction {
            ControllerInstruction::Reset => {
                self.stack.clear();
                0
            },
            ControllerInstruction::Cjs if cond => next,
            ControllerInstruction::Cjs => {
                self.stack.push(next)?;
                bar
            },
            ControllerInstruction::Jmap => mapped_address,
            ControllerInstruction::Cjp if cond => next,
            ControllerInstruction::Cjp => bar,
            ControllerInstruction::Push => {
                self.stack.push(bar)?;
                next
            },
            ControllerInstruction::Crtn if cond => next,
            ControllerInstruction::Crtn => self.stack.pop()?,
            ControllerInstruction::Cjpp if cond => next,
            ControllerInstruction::Cjpp => {
                self.stack.pop()?;
                bar
            },
            ControllerInstruction::Cont => next
        };

        self.mic = target;
        Ok(target)
    }
}
