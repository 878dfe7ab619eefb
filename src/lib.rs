//! Finite field arithmetic in Montgomery representation
//!
//! This library provides generic, modulus-agnostic modular arithmetic over
//! fixed-width big integers, intended as the computational kernel under
//! public-key primitives (modular exponentiation, inversion, Diffie-Hellman
//! style group operations).
//!
//! A [`montgomery::MontgomeryCtx`] is built once per odd modulus; operands
//! are converted into the Montgomery domain, combined with the field
//! operations, exponentiated with either the constant-time or the
//! variable-time engine, and converted back out.
//!
//! ```
//! use montfield::bigint::BigInt;
//! use montfield::montgomery::MontgomeryCtx;
//!
//! let ctx = MontgomeryCtx::<4>::new(BigInt::from_u64(97)).unwrap();
//! let a_m = ctx.to_mont(&BigInt::from_u64(5));
//! let exp = BigInt::<4>::from_u64(96);
//!
//! // Fermat: 5^96 ≡ 1 (mod 97)
//! let r = ctx.exp_consttime(&a_m, exp.limbs(), 7);
//! assert!(ctx.from_mont(&r).is_one());
//! ```

/// Big integer arithmetic module underneath the field engine
pub mod bigint;
/// Branch-free mask selection primitives
pub mod ct;
/// Montgomery modular arithmetic context
pub mod montgomery;

pub use bigint::{BigInt, BigInt256};
pub use montgomery::{check_modulus, MontgomeryCtx};
