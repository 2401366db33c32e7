use num_bigint::{BigUint, RandBigInt};
use num_traits::One;

// The fixed safe prime used for transport-key Diffie-Hellman. Reproduced
// verbatim (decimal) from the reference implementation's security module;
// interoperability depends on every peer using the exact same constant.
//
// NOTE: the distilled spec describes this as an approximately 6144-bit
// prime, but the literal recovered from the source is 4096-bit (1233
// decimal digits). We reproduce the source's actual constant rather than
// manufacture a larger one of our own, per the "follow the original when
// the spec is silent on an exact value" rule. See DESIGN.md.
const P_DECIMAL: &str = concat!(
    "674118774880662093257698364616957990838817917313189621763433008671821",
    "37196897524293100294385477509911251666985176430415411153583804934148112",
    "2270719203394689775275781619712787479926285627950841056894489914560578",
    "6644777704963171436690681451747767610668623662035091547675844577581284",
    "1107116099737332586447792783379920367661156585471296521174976519909711",
    "4053655493786697005150045341870428321756137613385997090886777268555313",
    "7414611143572205433662323266534295986300670493366452353956774419991946",
    "7120778376342973332729789484834427321305641994642429484887054720652378",
    "7143281611104732150605474884416750181204426751173773061831004280249984",
    "0515160495726996646570665581919782210861089443979066756563614980581896",
    "3647477490973785554423411033175221560647410381701525997354437960124876",
    "6355850848264286976617275698214554930850304944031744000262468873161694",
    "1403032728660983155586725969741246309018148831176048722092207759408047",
    "8277337764758577216471860266408165536226629039774758856734871478477888",
    "0460652370770255115242696211550472734853492720444777033094043832156353",
    "9899474371867589569522488773142013721743597372132076054869435258047774",
    "9466039212874034254763903083243504140048745275480322645573043647036118",
    "6034739679137202157599997031290815163983987",
);

/// The generator for the DH group. The source uses `g = 2`.
const GENERATOR: u32 = 2;

fn prime() -> BigUint {
    P_DECIMAL.parse().expect("DH prime literal is well-formed")
}

/// A fresh Diffie-Hellman keypair: a private scalar drawn uniformly from
/// `[1, P-1]` and the corresponding public value `g^private mod P`.
pub struct DhKeypair {
    private: BigUint,
    public: BigUint,
}

impl DhKeypair {
    pub fn generate() -> Self {
        let p = prime();
        let one = BigUint::one();
        let private = rand::thread_rng().gen_biguint_range(&one, &(&p - &one));
        let private = private + one; // shift [0, P-2] to [1, P-1]
        let public = BigUint::from(GENERATOR).modpow(&private, &p);
        DhKeypair { private, public }
    }

    pub fn public_key(&self) -> &BigUint {
        &self.public
    }

    /// The shared secret `counter_key^private mod P`, as big-endian bytes.
    pub fn shared_secret_bytes(&self, counter_key: &BigUint) -> Vec<u8> {
        let p = prime();
        counter_key.modpow(&self.private, &p).to_bytes_be()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_keypairs_derive_the_same_shared_secret() {
        let a = DhKeypair::generate();
        let b = DhKeypair::generate();

        let secret_a = a.shared_secret_bytes(b.public_key());
        let secret_b = b.shared_secret_bytes(a.public_key());

        assert_eq!(secret_a, secret_b);
    }

    #[test]
    fn public_key_is_in_range() {
        let p = prime();
        let kp = DhKeypair::generate();
        assert!(kp.public_key() < &p);
    }
}
