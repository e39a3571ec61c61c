use common::{InstrumentMeta, OrderSide, Tick};
use proptest::prelude::*;
use risk::{OrderSizer, SizingConfig};

fn quote(bid: f64, spread: f64) -> Tick {
    Tick {
        bid,
        ask: bid + spread,
        time: Default::default(),
    }
}

proptest! {
    /// BUY: SL below entry below TP. SELL: TP below entry below SL.
    #[test]
    fn stops_straddle_entry(
        bid in 0.5f64..100_000.0,
        spread in 0.0f64..5.0,
        sl_pips in 1.0f64..500.0,
        tp_pips in 1.0f64..500.0,
        multiplier in prop::sample::select(vec![1.0, 10.0, 100.0]),
    ) {
        let sizer = OrderSizer::new(SizingConfig {
            stop_loss_pips: sl_pips,
            take_profit_pips: tp_pips,
            price_multiplier: multiplier,
            ..Default::default()
        });
        let tick = quote(bid, spread);
        let meta = InstrumentMeta { point: 0.01, digits: 2 };

        let (sl, tp) = sizer.stop_levels(OrderSide::Buy, tick.bid, meta.point);
        prop_assert!(sl < tick.bid && tick.bid < tp);

        let (sl, tp) = sizer.stop_levels(OrderSide::Sell, tick.ask, meta.point);
        prop_assert!(tp < tick.ask && tick.ask < sl);

        let buy = sizer.build("XAUUSD", OrderSide::Buy, &tick, &meta).unwrap();
        prop_assert_eq!(buy.entry_price, tick.bid);
        let sell = sizer.build("XAUUSD", OrderSide::Sell, &tick, &meta).unwrap();
        prop_assert_eq!(sell.entry_price, tick.ask);
    }

    /// Invalid quotes are rejected, never sized.
    #[test]
    fn non_positive_quotes_are_rejected(bid in -1_000.0f64..=0.0) {
        let sizer = OrderSizer::new(SizingConfig::default());
        let meta = InstrumentMeta { point: 0.01, digits: 2 };
        prop_assert!(sizer.build("XAUUSD", OrderSide::Buy, &quote(bid, 0.02), &meta).is_err());
    }
}
