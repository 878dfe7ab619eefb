//! Example: Montgomery modular exponentiation
//!
//! Demonstrates both exponentiation engines over a small and a full-width
//! modulus.

use montfield::bigint::{BigInt, BigInt256};
use montfield::montgomery::MontgomeryCtx;

fn main() {
    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║  Montgomery Modular Exponentiation                            ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    // ------------------------------------------------------------------
    // Small modulus: n = 97, one limb
    // ------------------------------------------------------------------
    let ctx = MontgomeryCtx::<1>::new(BigInt::from_u64(97)).unwrap();
    let base = BigInt::<1>::from_u64(5);

    println!("\n  Computing 5^exp (mod 97) in the Montgomery domain:\n");

    let exp_10 = BigInt::<1>::from_u64(10);
    println!("  5^10     = {} (mod 97)", ctx.mod_pow(&base, &exp_10));

    let exp_large = BigInt::<1>::from_u64(123456);
    println!("  5^123456 = {} (mod 97)", ctx.mod_pow(&base, &exp_large));

    // Verify with Fermat's Little Theorem: a^(p-1) ≡ 1 (mod p)
    let exp_96 = BigInt::<1>::from_u64(96); // p - 1 = 96
    println!("\n  Verification (Fermat's Little Theorem):");
    println!(
        "  5^96 = {} (mod 97) - should be 1 ✓\n",
        ctx.mod_pow(&base, &exp_96)
    );

    // ------------------------------------------------------------------
    // Full-width modulus: the secp256k1 field prime, windowed path
    // ------------------------------------------------------------------
    let p = BigInt256::from_hex(
        "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F",
    );
    let ctx = MontgomeryCtx::<4>::new(p).unwrap();

    let a = BigInt256::from_u64(0xC0FFEE);
    let e = BigInt256::from_hex(
        "123456789ABCDEF0FEDCBA9876543210123456789ABCDEF0FEDCBA9876543210",
    );

    println!("  256-bit exponent over the secp256k1 prime (4-bit window path):\n");

    let a_m = ctx.to_mont(&a);
    let ct = ctx.from_mont(&ctx.exp_consttime(&a_m, e.limbs(), 256));
    let vt = ctx.from_mont(&ctx.exp_vartime(&a_m, e.limbs(), 256));

    println!("  exp_consttime: {}", ct);
    println!("  exp_vartime:   {}", vt);
    println!(
        "  agreement:     {}\n",
        if ct == vt { "✓ identical" } else { "✗ MISMATCH" }
    );
}
