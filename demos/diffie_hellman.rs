//! Diffie-Hellman key exchange over the Montgomery field engine
//!
//! Classic finite-field DH in the RFC 3526 1536-bit MODP group: both parties
//! raise the generator to a secret exponent with the constant-time engine,
//! exchange the results, and arrive at the same shared secret.
//!
//! # Running this example
//! ```bash
//! cargo run --example diffie_hellman --release
//! ```

use montfield::bigint::BigInt;
use montfield::montgomery::MontgomeryCtx;
use rand::Rng;

/// RFC 3526 MODP group 5: a 1536-bit safe prime (24 limbs × 64 bits).
const MODP_1536_HEX: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
83655D23DCA3AD961C62F356208552BB9ED529077096966D\
670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF";

const SECRET_BITS: usize = 256;

type Fp = BigInt<24>;

/// Draw a random 256-bit exponent for one party.
fn random_secret<R: Rng>(rng: &mut R) -> [u64; 4] {
    rng.gen()
}

/// g^secret mod p, constant-time over the secret.
fn derive_public(ctx: &MontgomeryCtx<24>, g: &Fp, secret: &[u64]) -> Fp {
    let g_m = ctx.to_mont(g);
    ctx.from_mont(&ctx.exp_consttime(&g_m, secret, SECRET_BITS))
}

/// peer_public^secret mod p, constant-time over the secret.
fn derive_shared(ctx: &MontgomeryCtx<24>, peer_public: &Fp, secret: &[u64]) -> Fp {
    let peer_m = ctx.to_mont(peer_public);
    ctx.from_mont(&ctx.exp_consttime(&peer_m, secret, SECRET_BITS))
}

fn main() {
    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║  Diffie-Hellman over F_p (RFC 3526 MODP group 5)              ║");
    println!("╚════════════════════════════════════════════════════════════════╝\n");

    let p = Fp::from_hex(MODP_1536_HEX);
    let g = Fp::from_u64(2);
    let ctx = MontgomeryCtx::<24>::new(p).expect("group prime is odd and > 1");

    println!("  Prime size: {} bits, generator g = 2\n", p.bit_length());

    let mut rng = rand::thread_rng();
    let alice_secret = random_secret(&mut rng);
    let bob_secret = random_secret(&mut rng);

    // Each side publishes g^secret mod p.
    let alice_public = derive_public(&ctx, &g, &alice_secret);
    let bob_public = derive_public(&ctx, &g, &bob_secret);

    println!("  Alice's public value: 0x{}...", &alice_public.to_hex()[..32]);
    println!("  Bob's   public value: 0x{}...\n", &bob_public.to_hex()[..32]);

    // Each side raises the peer's value to its own secret.
    let alice_shared = derive_shared(&ctx, &bob_public, &alice_secret);
    let bob_shared = derive_shared(&ctx, &alice_public, &bob_secret);

    println!("  Alice's shared secret: 0x{}...", &alice_shared.to_hex()[..32]);
    println!("  Bob's   shared secret: 0x{}...\n", &bob_shared.to_hex()[..32]);

    if alice_shared == bob_shared {
        println!("  ✓ Shared secrets match");
    } else {
        println!("  ✗ MISMATCH - key exchange failed");
        std::process::exit(1);
    }
    println!();
}
