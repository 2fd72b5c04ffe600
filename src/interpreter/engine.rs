// Execution engine for the integer machine

use crate::interpreter::constants::IDLE_INPUT;
use crate::interpreter::decoder::{decode, disassemble, Instruction, Opcode};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::io::{Channel, Input};
use crate::memory::{Memory, MemoryFault};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Lifecycle of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    AwaitingInput,
    Halted,
}

/// Outcome of executing a single instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// An instruction ran and execution can continue
    Executed,
    /// An output instruction produced a value
    Output(i64),
    /// An input instruction is waiting; answer it with [`Machine::supply`]
    NeedsInput,
    Halted,
}

/// Point at which [`Machine::resume`] hands control back to its driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yield {
    Output(i64),
    NeedsInput,
    Halted,
}

/// Final memory and output of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub memory: Memory,
    pub output: Vec<i64>,
}

/// A single integer machine
///
/// The machine never assumes a concurrency runtime. Drivers either call
/// [`Machine::run`] with a [`Channel`], or loop over [`Machine::resume`] and
/// answer [`Yield::NeedsInput`] themselves with [`Machine::supply`].
#[derive(Debug, Clone)]
pub struct Machine {
    /// Program and data
    memory: Memory,

    /// Address of the next instruction
    pc: usize,

    /// Offset for relative-mode parameters
    relative_base: i64,

    state: MachineState,

    /// Pre-supplied inputs, consumed before any provider is asked
    backlog: VecDeque<i64>,

    /// Every value produced so far
    output: Vec<i64>,

    /// Number of inputs consumed (the index passed to providers)
    inputs_consumed: usize,

    /// Number of instructions decoded
    steps: u64,

    step_limit: Option<u64>,

    /// Value written when a provider answers `Input::NoValue`
    idle_input: i64,

    /// Physical address of the most recent memory write
    last_write: Option<usize>,

    /// First fatal error; every later step reports it again
    fault: Option<RuntimeError>,
}

impl Machine {
    /// Create a machine over a memory image, ready to run from address 0
    pub fn new(image: Vec<i64>) -> Self {
        Self::from_memory(Memory::new(image))
    }

    pub fn from_memory(memory: Memory) -> Self {
        Machine {
            memory,
            pc: 0,
            relative_base: 0,
            state: MachineState::Running,
            backlog: VecDeque::new(),
            output: Vec::new(),
            inputs_consumed: 0,
            steps: 0,
            step_limit: None,
            idle_input: IDLE_INPUT,
            last_write: None,
            fault: None,
        }
    }

    /// Append values to the input backlog
    pub fn with_input<I: IntoIterator<Item = i64>>(mut self, input: I) -> Self {
        self.backlog.extend(input);
        self
    }

    /// Abort with [`RuntimeError::StepLimitExceeded`] after `limit` instructions
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Override the value written for `Input::NoValue`
    pub fn with_idle_input(mut self, value: i64) -> Self {
        self.idle_input = value;
        self
    }

    pub fn push_input(&mut self, value: i64) {
        self.backlog.push_back(value);
    }

    /// Execute one instruction
    ///
    /// A fault is fatal: the machine keeps its state at the faulting
    /// instruction and every later call returns the same error.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        let result = self.advance();
        if let Err(e) = &result {
            debug!(pc = self.pc, error = %e, "machine faulted");
            self.fault = Some(e.clone());
        }
        result
    }

    fn advance(&mut self) -> Result<Step, RuntimeError> {
        match self.state {
            MachineState::Halted => return Ok(Step::Halted),
            MachineState::AwaitingInput => {
                // A value may have been queued since the request was made
                return match self.backlog.pop_front() {
                    Some(value) => {
                        self.complete_input(value)?;
                        Ok(Step::Executed)
                    }
                    None => Ok(Step::NeedsInput),
                };
            }
            MachineState::Running => {}
        }

        if let Some(limit) = self.step_limit {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimitExceeded { limit, pc: self.pc });
            }
        }

        let instruction = decode(self.memory.load(self.pc));
        let op = instruction.op().ok_or(RuntimeError::DecodeFault {
            opcode: instruction.opcode,
            pc: self.pc,
        })?;

        trace!(
            pc = self.pc,
            rb = self.relative_base,
            "{}",
            disassemble(&self.memory, self.pc).text
        );
        self.steps += 1;

        match op {
            Opcode::Add => {
                let a = self.param(&instruction, 0)?;
                let b = self.param(&instruction, 1)?;
                self.write_param(&instruction, 2, a.wrapping_add(b))?;
                self.pc += 4;
            }

            Opcode::Mul => {
                let a = self.param(&instruction, 0)?;
                let b = self.param(&instruction, 1)?;
                self.write_param(&instruction, 2, a.wrapping_mul(b))?;
                self.pc += 4;
            }

            Opcode::Input => {
                // Nothing is consumed for an unwritable destination
                self.input_target(&instruction)?;
                match self.backlog.pop_front() {
                    Some(value) => self.complete_input(value)?,
                    None => {
                        debug!(pc = self.pc, request = self.inputs_consumed, "awaiting input");
                        self.state = MachineState::AwaitingInput;
                        return Ok(Step::NeedsInput);
                    }
                }
            }

            Opcode::Output => {
                let value = self.param(&instruction, 0)?;
                self.output.push(value);
                self.pc += 2;
                return Ok(Step::Output(value));
            }

            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let condition = self.param(&instruction, 0)?;
                let target = self.param(&instruction, 1)?;
                if (condition != 0) == (op == Opcode::JumpIfTrue) {
                    self.pc = usize::try_from(target).map_err(|_| RuntimeError::AddressFault {
                        address: target,
                        pc: self.pc,
                    })?;
                } else {
                    self.pc += 3;
                }
            }

            Opcode::LessThan => {
                let a = self.param(&instruction, 0)?;
                let b = self.param(&instruction, 1)?;
                self.write_param(&instruction, 2, i64::from(a < b))?;
                self.pc += 4;
            }

            Opcode::Equals => {
                let a = self.param(&instruction, 0)?;
                let b = self.param(&instruction, 1)?;
                self.write_param(&instruction, 2, i64::from(a == b))?;
                self.pc += 4;
            }

            Opcode::AdjustBase => {
                let delta = self.param(&instruction, 0)?;
                self.relative_base = self.relative_base.wrapping_add(delta);
                self.pc += 2;
            }

            Opcode::Halt => {
                debug!(pc = self.pc, steps = self.steps, "halted");
                self.state = MachineState::Halted;
                return Ok(Step::Halted);
            }
        }

        Ok(Step::Executed)
    }

    /// Run until the machine produces output, needs input, or halts
    pub fn resume(&mut self) -> Result<Yield, RuntimeError> {
        loop {
            match self.step()? {
                Step::Executed => continue,
                Step::Output(value) => return Ok(Yield::Output(value)),
                Step::NeedsInput => return Ok(Yield::NeedsInput),
                Step::Halted => return Ok(Yield::Halted),
            }
        }
    }

    /// Answer the pending input request
    pub fn supply(&mut self, input: Input) -> Result<(), RuntimeError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if self.state != MachineState::AwaitingInput {
            return Err(RuntimeError::NotAwaitingInput { pc: self.pc });
        }

        match input {
            Input::Value(value) => self.complete_input(value),
            Input::NoValue => self.complete_input(self.idle_input),
            Input::Terminate => {
                debug!(pc = self.pc, "terminated while awaiting input");
                self.state = MachineState::Halted;
                Ok(())
            }
        }
    }

    /// Drive the machine to completion through a channel
    pub fn run(&mut self, channel: &mut Channel<'_>) -> Result<(), RuntimeError> {
        loop {
            match self.resume()? {
                Yield::Output(value) => channel.emit(value),
                Yield::NeedsInput => self.answer_from(channel)?,
                Yield::Halted => return Ok(()),
            }
        }
    }

    /// Ask the channel's provider for the pending input and supply it
    pub(crate) fn answer_from(&mut self, channel: &mut Channel<'_>) -> Result<(), RuntimeError> {
        let pc = self.pc;
        let input = match channel.request(self.inputs_consumed) {
            None => return Err(RuntimeError::InputUnavailable { pc }),
            Some(Err(e)) => return Err(RuntimeError::ProviderFault { message: e.0, pc }),
            Some(Ok(input)) => input,
        };
        self.supply(input)
    }

    fn complete_input(&mut self, value: i64) -> Result<(), RuntimeError> {
        let instruction = decode(self.memory.load(self.pc));
        self.write_param(&instruction, 0, value)?;
        self.inputs_consumed += 1;
        self.pc += 2;
        self.state = MachineState::Running;
        Ok(())
    }

    /// Destination of the input instruction at pc
    fn input_target(&self, instruction: &Instruction) -> Result<usize, RuntimeError> {
        let operand = self.memory.load(self.pc + 1);
        Memory::address_of(operand, instruction.modes[0], self.relative_base)
            .map_err(|fault| self.memory_fault(fault, instruction))
    }

    /// Read parameter `index` of the instruction at pc
    fn param(&self, instruction: &Instruction, index: usize) -> Result<i64, RuntimeError> {
        let operand = self.memory.load(self.pc + 1 + index);
        self.memory
            .read(operand, instruction.modes[index], self.relative_base)
            .map_err(|fault| self.memory_fault(fault, instruction))
    }

    /// Write through parameter `index` of the instruction at pc
    fn write_param(
        &mut self,
        instruction: &Instruction,
        index: usize,
        value: i64,
    ) -> Result<(), RuntimeError> {
        let operand = self.memory.load(self.pc + 1 + index);
        match self
            .memory
            .write(operand, instruction.modes[index], value, self.relative_base)
        {
            Ok(address) => {
                self.last_write = Some(address);
                Ok(())
            }
            Err(fault) => Err(self.memory_fault(fault, instruction)),
        }
    }

    fn memory_fault(&self, fault: MemoryFault, instruction: &Instruction) -> RuntimeError {
        match fault {
            MemoryFault::NegativeAddress(address) => RuntimeError::AddressFault {
                address,
                pc: self.pc,
            },
            MemoryFault::ImmediateWrite => RuntimeError::WriteModeFault {
                opcode: instruction.opcode,
                pc: self.pc,
            },
            MemoryFault::UnsupportedMode(mode) => RuntimeError::ModeFault {
                mode,
                opcode: instruction.opcode,
                pc: self.pc,
            },
        }
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == MachineState::Halted
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Output record so far
    pub fn output(&self) -> &[i64] {
        &self.output
    }

    pub fn inputs_consumed(&self) -> usize {
        self.inputs_consumed
    }

    /// Backlog values not yet consumed
    pub fn pending_input(&self) -> usize {
        self.backlog.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_write(&self) -> Option<usize> {
        self.last_write
    }

    /// The fatal error that stopped this machine, if any
    pub fn fault(&self) -> Option<&RuntimeError> {
        self.fault.as_ref()
    }

    pub fn into_execution(self) -> Execution {
        Execution {
            memory: self.memory,
            output: self.output,
        }
    }
}

/// Run a program to completion with a backlog and a channel
pub fn execute<I>(
    image: Vec<i64>,
    input: I,
    channel: &mut Channel<'_>,
) -> Result<Execution, RuntimeError>
where
    I: IntoIterator<Item = i64>,
{
    let mut machine = Machine::new(image).with_input(input);
    machine.run(channel)?;
    Ok(machine.into_execution())
}
