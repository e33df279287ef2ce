use color_blind_check::*;
use proptest::prelude::*;

fn color() -> impl Strategy<Value = Color> {
    any::<(u8, u8, u8)>().prop_map(|(r, g, b)| Color::new(r, g, b))
}

fn palette(max: usize) -> impl Strategy<Value = Vec<Color>> {
    proptest::collection::vec(color(), 0 .. max)
}

proptest! {
    #[test]
    fn fewer_than_two_colors_is_safe(colors in palette(2)) {
        prop_assert!(Checker::new().check(&colors).is_safe());
        let hex: Vec<String> = colors.iter().map(Color::hex).collect();
        prop_assert!(check_palette(&hex).unwrap().is_safe());
    }

    #[test]
    fn order_does_not_matter(
        (colors, shuffled) in palette(7)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())))
    {
        let checker = Checker::new();
        prop_assert_eq!(checker.check(&colors), checker.check(&shuffled));
        for d in Deficiency::ALL {
            prop_assert_eq!(checker.problematic_pairs(&colors, d),
                            checker.problematic_pairs(&shuffled, d));
        }
    }

    #[test]
    fn thresholds_hold_for_every_pair(colors in palette(7)) {
        let checker = Checker::new();
        let verdict = checker.check(&colors);
        for d in Deficiency::ALL {
            let mut any_problematic = false;
            for p in checker.pairs(&colors, d) {
                prop_assert!(p.first < p.second);
                if p.distance_norm < JUST_NOTICEABLE_DIFFERENCE {
                    prop_assert_eq!(p.distance_sim, None);
                }
                if let Some(sim) = p.distance_sim {
                    if sim >= JUST_NOTICEABLE_DIFFERENCE {
                        prop_assert!(!p.is_problematic());
                    }
                }
                any_problematic |= p.is_problematic();
            }
            prop_assert_eq!(verdict.contains(d), any_problematic);
        }
    }

    #[test]
    fn difference_is_symmetric(a in color(), b in color()) {
        prop_assert_eq!(a.difference(&b), b.difference(&a));
        prop_assert!(a.delta_e(&b) >= 0.);
    }

    #[test]
    fn simulation_is_pure(c in color(), alpha in any::<u8>()) {
        let c = Color::with_alpha(c.rgb().r, c.rgb().g, c.rgb().b, alpha);
        for d in Deficiency::ALL {
            let once = d.simulate(c);
            prop_assert_eq!(once, d.simulate(c));
            prop_assert_eq!(once.alpha(), alpha);
            let text = simulate_color(&c.hex(), d.name()).unwrap();
            prop_assert_eq!(text, once.hex());
        }
    }
}
