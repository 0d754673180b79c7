// Released under MIT License.
// Copyright (c) 2023-2025 Ladislav Bartos

//! Implementation of ProgressPrinter structure for printing the progress of trajectory alignment.

use colored::{ColoredString, Colorize};
use std::io::Write;

/// Progress of the alignment of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    /// Frames are being read from the trajectories.
    Running,
    /// All frames have been read and are being superposed.
    Aligning,
    /// Alignment has been completed.
    Completed,
    /// Alignment failed.
    Failed,
}

/// String that can be used inside `ProgressPrinter`.
#[derive(Debug, Clone, PartialEq)]
struct ProgressMessage {
    msg: ColoredString,
}

impl ProgressMessage {
    /// Create new `ProgressMessage`.
    ///
    /// ## Panics
    /// Panics if the string is longer than 9 characters.
    fn new(string: ColoredString) -> Self {
        if string.chars().count() > 9 {
            panic!("FATAL VTRAJ ERROR | ProgressMessage::new | `ProgressMessage` can not be longer than 9 characters.");
        }

        ProgressMessage { msg: string }
    }

    /// Write formatted `ProgressMessage`.
    fn print(&self, out: &mut dyn Write, colored: bool) {
        if colored {
            write!(out, "[{: ^9}]   ", self.msg)
                .expect("FATAL VTRAJ ERROR | ProgressMessage::print (1) | Could not write to `ProgressPrinter` stream.");
        } else {
            write!(out, "[{: ^9}]   ", self.msg.as_ref() as &str)
                .expect("FATAL VTRAJ ERROR | ProgressMessage::print (2) | Could not write to `ProgressPrinter` stream.");
        }
    }
}

/// Structure handling printing of progress of aligning a trajectory.
/// Constructed using `ProgressPrinter::new()` and associated with an aligned trajectory
/// using `AlignedVirtualTrajectory::print_progress()`.
pub struct ProgressPrinter {
    /// Stream to write the progress info to.
    output: Box<dyn Write>,
    /// Current status of the alignment. Default: ProgressStatus::Running.
    status: ProgressStatus,
    /// Print every `print_freq`th frame. Default: 100 frames.
    print_freq: usize,
    /// If true, the output will be colored. Default: true.
    colored: bool,
    /// Printed with the number of the current frame. Default: "Frame".cyan().
    frame_msg: ColoredString,
    /// Default: "RUNNING".yellow().
    running_msg: ProgressMessage,
    /// Default: "ALIGNING".bright_purple().
    aligning_msg: ProgressMessage,
    /// Default: "COMPLETED".green().
    completed_msg: ProgressMessage,
    /// Default: "FAILED!".red().
    failed_msg: ProgressMessage,
    /// String terminating the progress message. Default: `\r` (carriage return).
    terminating: String,
}

impl ProgressPrinter {
    /// Create an instance of `ProgressPrinter` with default parameters.
    ///
    /// The default values of the `ProgressPrinter` parameters.
    /// - `output`: `std::io::stdout()` (stream to write the progress info to)
    /// - `status`: `ProgressStatus::Running` (current status of the alignment)
    /// - `print_freq`: `100` (progress info will be printed every 100 frames read)
    /// - `colored`: `true` (should the output be colored?)
    /// - `frame_msg`: `"Frame".cyan()` (string printed with the number of the current frame)
    /// - `running_msg`: `"RUNNING".yellow()` (string printed while the frames are being read)
    /// - `aligning_msg`: `"ALIGNING".bright_purple()` (string printed while the frames are being superposed)
    /// - `completed_msg`: `"COMPLETED".green()` (string printed when the alignment is completed)
    /// - `failed_msg`: `"FAILED!".red()` (string printed when the alignment failed)
    /// - `terminating`: `\r` (string terminating the progress message; useful to set to `\n` when printing to a file)
    ///
    /// ## Example
    /// ```no_run
    /// use vtraj_rs::prelude::*;
    ///
    /// let file = std::fs::File::create("alignment.log").unwrap();
    /// let printer = ProgressPrinter::new()
    ///     .with_output(Box::from(file))
    ///     .with_print_freq(500)
    ///     .with_colored(false)
    ///     .with_terminating("\n");
    /// ```
    pub fn new() -> Self {
        ProgressPrinter {
            output: Box::from(std::io::stdout()),
            status: ProgressStatus::Running,
            print_freq: 100,
            colored: true,
            frame_msg: "Frame".cyan(),
            running_msg: ProgressMessage::new("RUNNING".yellow()),
            aligning_msg: ProgressMessage::new("ALIGNING".bright_purple()),
            completed_msg: ProgressMessage::new("COMPLETED".green()),
            failed_msg: ProgressMessage::new("FAILED!".red()),
            terminating: String::from("\r"),
        }
    }

    /// Create new `ProgressPrinter` with specific `output` stream.
    pub fn with_output(mut self, stream: Box<dyn Write>) -> Self {
        self.output = stream;
        self
    }

    /// Create new `ProgressPrinter` with specific value for `print_freq`.
    /// A frequency of 0 is treated as 1.
    pub fn with_print_freq(mut self, print_freq: usize) -> Self {
        self.print_freq = print_freq.max(1);
        self
    }

    /// Create new `ProgressPrinter` with specific value for `colored`.
    pub fn with_colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Create new `ProgressPrinter` with specific value for `frame_msg`.
    pub fn with_frame_msg(mut self, frame_msg: ColoredString) -> Self {
        self.frame_msg = frame_msg;
        self
    }

    /// Create new `ProgressPrinter` with specific value for `running_msg`.
    ///
    /// ## Panics
    /// Panics if the `running_msg` is longer than 9 characters.
    pub fn with_running_msg(mut self, running_msg: ColoredString) -> Self {
        self.running_msg = ProgressMessage::new(running_msg);
        self
    }

    /// Create new `ProgressPrinter` with specific value for `aligning_msg`.
    ///
    /// ## Panics
    /// Panics if the `aligning_msg` is longer than 9 characters.
    pub fn with_aligning_msg(mut self, aligning_msg: ColoredString) -> Self {
        self.aligning_msg = ProgressMessage::new(aligning_msg);
        self
    }

    /// Create new `ProgressPrinter` with specific value for `completed_msg`.
    ///
    /// ## Panics
    /// Panics if the `completed_msg` is longer than 9 characters.
    pub fn with_completed_msg(mut self, completed_msg: ColoredString) -> Self {
        self.completed_msg = ProgressMessage::new(completed_msg);
        self
    }

    /// Create new `ProgressPrinter` with specific value for `failed_msg`.
    ///
    /// ## Panics
    /// Panics if the `failed_msg` is longer than 9 characters.
    pub fn with_failed_msg(mut self, failed_msg: ColoredString) -> Self {
        self.failed_msg = ProgressMessage::new(failed_msg);
        self
    }

    /// Create new `ProgressPrinter` with specific value for `terminating`.
    pub fn with_terminating(mut self, string: &str) -> Self {
        self.terminating = string.to_string();
        self
    }

    /// Get the current status of the printer.
    pub fn get_status(&self) -> ProgressStatus {
        self.status
    }

    /// Set new status to an already constructed `ProgressPrinter`.
    pub fn set_status(&mut self, status: ProgressStatus) {
        self.status = status;
    }

    /// Print progress info about the alignment.
    /// `frame_number` is the number of frames processed so far out of `n_frames`.
    ///
    /// While running, the info is only printed for every `print_freq`th frame.
    pub fn print(&mut self, frame_number: usize, n_frames: usize) {
        if self.status == ProgressStatus::Running && frame_number % self.print_freq != 0 {
            return;
        }

        match self.status {
            ProgressStatus::Running => self.running_msg.print(&mut self.output, self.colored),
            ProgressStatus::Aligning => self.aligning_msg.print(&mut self.output, self.colored),
            ProgressStatus::Completed => self.completed_msg.print(&mut self.output, self.colored),
            ProgressStatus::Failed => self.failed_msg.print(&mut self.output, self.colored),
        }

        let frame_msg = if self.colored {
            self.frame_msg.to_string()
        } else {
            (self.frame_msg.as_ref() as &str).to_owned()
        };

        write!(
            self.output,
            "{} {:10} / {:<10}{}",
            frame_msg, frame_number, n_frames, self.terminating
        )
        .expect("FATAL VTRAJ ERROR | ProgressPrinter::print (1) | Could not write to `ProgressPrinter` stream.");

        match self.status {
            ProgressStatus::Running | ProgressStatus::Aligning => (),
            ProgressStatus::Completed | ProgressStatus::Failed => {
                writeln!(self.output).expect(
                    "FATAL VTRAJ ERROR | ProgressPrinter::print (2) | Could not write to `ProgressPrinter` stream.",
                );
            }
        }

        self.output
            .flush()
            .expect("FATAL VTRAJ ERROR | ProgressPrinter::print (3) | Could not flush `ProgressPrinter` stream.");
    }
}

impl Default for ProgressPrinter {
    fn default() -> Self {
        Self::new()
    }
}

/******************************/
/*         UNIT TESTS         */
/******************************/
