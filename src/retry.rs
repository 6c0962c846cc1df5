//! Bounds for the polling loops.
//!
//! None of the devices offer an interrupt, so every "wait for X" is a loop.
//! The loops never decide on their own when to give up; they ask a
//! [`RetryPolicy`] before each attempt.

use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub trait RetryPolicy {
	/// whether another attempt may start, given the number already made
	fn allow(&mut self, attempts_made: u64) -> bool;
}

/// At most this many attempts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Attempts(pub u64);

impl RetryPolicy for Attempts {
	fn allow(&mut self, attempts_made: u64) -> bool {
		attempts_made < self.0
	}
}

/// Attempts may start until the given point in time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Deadline(pub Instant);

impl Deadline {
	pub fn after(timeout: Duration) -> Self {
		Deadline(Instant::now() + timeout)
	}
}

impl RetryPolicy for Deadline {
	fn allow(&mut self, _attempts_made: u64) -> bool {
		Instant::now() < self.0
	}
}

/// Stops at whichever limit is hit first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AttemptsOrDeadline {
	pub attempts: Attempts,
	pub deadline: Deadline,
}

impl RetryPolicy for AttemptsOrDeadline {
	fn allow(&mut self, attempts_made: u64) -> bool {
		self.attempts.allow(attempts_made) && self.deadline.allow(attempts_made)
	}
}

impl<F> RetryPolicy for F
where
	F: FnMut(u64) -> bool,
{
	fn allow(&mut self, attempts_made: u64) -> bool {
		self(attempts_made)
	}
}

/// Counts attempts against a policy.
#[derive(Debug)]
pub struct RetryBudget<P: RetryPolicy> {
	policy: P,
	attempts_made: u64,
}

impl<P: RetryPolicy> RetryBudget<P> {
	pub fn new(policy: P) -> Self {
		RetryBudget {
			policy,
			attempts_made: 0,
		}
	}

	/// consume one attempt; false once the policy refuses
	pub fn next_attempt(&mut self) -> bool {
		if !self.policy.allow(self.attempts_made) {
			return false;
		}
		self.attempts_made += 1;
		true
	}

	pub fn attempts_made(&self) -> u64 {
		self.attempts_made
	}
}

/// Sleep for at least `duration`, even if woken early.
pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn attempts_budget() {
		let mut budget = RetryBudget::new(Attempts(3));
		assert!(budget.next_attempt());
		assert!(budget.next_attempt());
		assert!(budget.next_attempt());
		assert!(!budget.next_attempt());
		assert!(!budget.next_attempt());
		assert_eq!(budget.attempts_made(), 3);
	}

	#[test]
	fn zero_attempts() {
		let mut budget = RetryBudget::new(Attempts(0));
		assert!(!budget.next_attempt());
		assert_eq!(budget.attempts_made(), 0);
	}

	#[test]
	fn expired_deadline() {
		let mut budget = RetryBudget::new(Deadline(Instant::now()));
		assert!(!budget.next_attempt());

		let mut budget = RetryBudget::new(AttemptsOrDeadline {
			attempts: Attempts(2),
			deadline: Deadline::after(Duration::from_secs(3600)),
		});
		assert!(budget.next_attempt());
		assert!(budget.next_attempt());
		assert!(!budget.next_attempt());
	}

	#[test]
	fn closure_can_cancel() {
		let mut cancelled = false;
		let mut budget = RetryBudget::new(|made: u64| {
			if made == 2 {
				cancelled = true;
			}
			!cancelled
		});
		assert!(budget.next_attempt());
		assert!(budget.next_attempt());
		assert!(!budget.next_attempt());
		assert_eq!(budget.attempts_made(), 2);
	}
}
